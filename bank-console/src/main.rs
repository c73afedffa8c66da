//! Bank console - sign up, transfer and watch balances from the terminal

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::{Confirm, Select};
use indicatif::{ProgressBar, ProgressStyle};

use bank_core::config::Config;
use bank_core::BankContext;

mod logging;
mod output;
mod views;

use views::Session;

const MENU: [&str; 4] = ["Sign up", "Transfer", "Show balances", "Quit"];

fn main() -> ExitCode {
    logging::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    if atty::isnt(atty::Stream::Stdin) {
        anyhow::bail!("bank needs an interactive terminal");
    }

    let config = Config::from_env().context("Invalid configuration")?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    println!("{}", "Resemble Bank".bold());
    if config.demo_mode {
        output::info("Demo mode: using an in-memory ledger.");
    }

    let Some(ctx) = connect(&runtime, &config)? else {
        return Ok(());
    };

    let mut session = Session::new(runtime, ctx);
    let result = menu_loop(&mut session);
    session.close()?;
    result
}

/// Connect, offering retries instead of exiting when the ledger is down
fn connect(runtime: &tokio::runtime::Runtime, config: &Config) -> Result<Option<BankContext>> {
    loop {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner());
        spinner.set_message(format!("Connecting to {}...", config.endpoint));
        spinner.enable_steady_tick(Duration::from_millis(100));

        let result = runtime.block_on(BankContext::connect(config.clone()));
        spinner.finish_and_clear();

        match result {
            Ok(ctx) => return Ok(Some(ctx)),
            Err(e) => {
                tracing::warn!(error = %e, "connect failed");
                output::banner(&format!("Could not connect to the bank: {}", e));
                let retry = Confirm::new()
                    .with_prompt("Retry?")
                    .default(true)
                    .interact()?;
                if !retry {
                    return Ok(None);
                }
            }
        }
    }
}

fn menu_loop(session: &mut Session) -> Result<()> {
    loop {
        println!();
        session.show_banner();

        let choice = Select::new()
            .with_prompt("What would you like to do?")
            .items(&MENU)
            .default(0)
            .interact()?;

        match choice {
            0 => views::sign_up::run(session)?,
            1 => views::transfer::run(session)?,
            2 => views::balances::show(session),
            _ => return Ok(()),
        }
    }
}
