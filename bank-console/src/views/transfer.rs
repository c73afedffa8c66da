//! Transfer view - move funds between two accounts

use anyhow::Result;
use colored::Colorize;
use dialoguer::{Input, Select};

use bank_core::services::TransferForm;

use super::Session;
use crate::output;

/// Index of `current` among `options`, for pre-selecting a picker
fn selected_index(options: &[String], current: &str) -> usize {
    options.iter().position(|o| o == current).unwrap_or(0)
}

pub fn run(session: &mut Session) -> Result<()> {
    println!("{}", "Transfer".bold());

    let options = TransferForm::account_options(&session.ctx().client);
    if options.len() < 2 {
        output::warning("At least two accounts are needed for a transfer.");
        return Ok(());
    }

    let from = Select::new()
        .with_prompt("From")
        .items(&options)
        .default(selected_index(&options, &session.transfer.from_account_id))
        .interact()?;
    session.transfer.set_from_account_id(options[from].clone());

    let to = Select::new()
        .with_prompt("To")
        .items(&options)
        .default(selected_index(&options, &session.transfer.to_account_id))
        .interact()?;
    session.transfer.set_to_account_id(options[to].clone());

    let amount: String = Input::new()
        .with_prompt("Amount")
        .with_initial_text(session.transfer.amount.clone())
        .allow_empty(true)
        .interact_text()?;
    session.transfer.set_amount(amount);

    let mut form = std::mem::take(&mut session.transfer);
    // The outcome is recorded on the form and shown below
    if let Err(e) = session.block_on(form.submit(&session.ctx().client)) {
        tracing::debug!(error = %e, "transfer rejected");
    }
    output::form_status(form.status());
    session.transfer = form;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selected_index() {
        let options = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        assert_eq!(selected_index(&options, "C"), 2);
        assert_eq!(selected_index(&options, ""), 0);
        assert_eq!(selected_index(&options, "gone"), 0);
    }
}
