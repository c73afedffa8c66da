//! Sign-up view - open an account with an initial balance

use anyhow::Result;
use colored::Colorize;
use dialoguer::Input;

use super::Session;
use crate::output;

pub fn run(session: &mut Session) -> Result<()> {
    println!("{}", "Sign Up".bold());

    // Fields left over from a failed attempt are offered for editing
    let account_id: String = Input::new()
        .with_prompt("Account ID")
        .with_initial_text(session.sign_up.account_id.clone())
        .allow_empty(true)
        .interact_text()?;
    session.sign_up.set_account_id(account_id);

    let balance: String = Input::new()
        .with_prompt("Balance")
        .with_initial_text(session.sign_up.initial_deposit.clone())
        .allow_empty(true)
        .interact_text()?;
    session.sign_up.set_initial_deposit(balance);

    let mut form = std::mem::take(&mut session.sign_up);
    // The outcome is recorded on the form and shown below
    if let Err(e) = session.block_on(form.submit(&session.ctx().client)) {
        tracing::debug!(error = %e, "sign-up rejected");
    }
    output::form_status(form.status());
    session.sign_up = form;

    Ok(())
}
