//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};

use bank_core::services::FormStatus;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Print a non-fatal connection banner
pub fn banner(msg: &str) {
    println!("{}", format!(" ! {} ", msg).black().on_yellow());
}

/// Print the outcome attached to a form
pub fn form_status(status: &FormStatus) {
    match status {
        FormStatus::Idle => {}
        FormStatus::Succeeded(msg) => success(msg),
        FormStatus::Failed(msg) => error(msg),
    }
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}
