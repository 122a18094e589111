use clap::{Parser, Subcommand};

mod cmd;
mod prices;
mod tax;
mod transaction;

use cmd::report::ReportCommand;
use cmd::transactions::TransactionsCommand;
use cmd::validate::ValidateCommand;

/// Calculate realized capital gains on crypto disposals with FIFO lot matching
#[derive(Parser, Debug)]
#[command(name = "fifotax", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calculate and render the realized gains report
    Report(ReportCommand),
    /// List decoded transactions with their classification
    Transactions(TransactionsCommand),
    /// Surface data-quality issues without generating a report
    Validate(ValidateCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Report(cmd) => cmd.exec(),
        Command::Transactions(cmd) => cmd.exec(),
        Command::Validate(cmd) => cmd.exec(),
    }
}
