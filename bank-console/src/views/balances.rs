//! Balances view - table of all accounts

use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use bank_core::BalanceSnapshot;

use super::Session;
use crate::output;

/// Render a snapshot as a two-column table
pub fn render(snapshot: &BalanceSnapshot) -> Table {
    let mut table = output::create_table();
    table.set_header(vec!["Account ID", "Balance"]);

    for account in snapshot.balances() {
        table.add_row(vec![
            Cell::new(&account.account_id),
            Cell::new(account.balance.to_string()).set_alignment(CellAlignment::Right),
        ]);
    }

    table
}

pub fn show(session: &Session) {
    let snapshot = session.ctx().client.snapshot();

    println!("{}", "Accounts".bold());
    if snapshot.is_empty() {
        output::info("No accounts yet. Sign up to open one.");
        return;
    }

    println!("{}", render(&snapshot));
    println!(
        "{}",
        format!(
            "Total {} across {} accounts, updated {}",
            snapshot.total(),
            snapshot.len(),
            snapshot.received_at.format("%H:%M:%S")
        )
        .dimmed()
    );
}
