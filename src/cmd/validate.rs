//! Validate command - surface data-quality issues without generating a report

use crate::cmd::{read_prices, read_transactions};
use crate::tax::{calculate_fifo, DisposalRecord, DisposalWarning, FifoConfig};
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// Transaction CSV file (or "-" for stdin)
    #[arg(short, long)]
    transactions: PathBuf,

    /// Historical daily close prices CSV
    #[arg(short, long)]
    prices: PathBuf,

    /// Asset label
    #[arg(short, long, default_value = "BTC")]
    asset: String,

    /// Price used when a date is missing from the price table
    #[arg(long, default_value = "2217.79")]
    fallback_price: Decimal,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// A validation issue for output
#[derive(Debug, Clone, Serialize)]
struct ValidationIssue {
    #[serde(rename = "type")]
    issue_type: String,
    location: String,
    message: String,
}

/// JSON output structure
#[derive(Debug, Serialize)]
struct ValidationOutput {
    issue_count: usize,
    issues: Vec<ValidationIssue>,
}

impl ValidateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let import = read_transactions(&self.transactions)?;
        let prices = read_prices(&self.prices, self.fallback_price)?;
        let config = FifoConfig {
            asset: self.asset.clone(),
            long_term_days: 365,
        };
        let report = calculate_fifo(&import.transactions, &prices, &config);

        let mut issues: Vec<ValidationIssue> = import
            .rejected
            .iter()
            .map(|r| ValidationIssue {
                issue_type: "MalformedRecord".to_string(),
                location: format!("row {}", r.row),
                message: r.reason.clone(),
            })
            .collect();

        for (disposal, warning) in report.warnings() {
            issues.push(warning_issue(disposal, warning));
        }

        if self.json {
            self.print_json(&issues)?;
        } else {
            self.print_text(&issues);
        }

        // Exit with code 1 if issues found
        if !issues.is_empty() {
            std::process::exit(1);
        }
        Ok(())
    }

    fn print_text(&self, issues: &[ValidationIssue]) {
        println!();
        println!("VALIDATION RESULTS ({})", self.asset);
        println!();

        if issues.is_empty() {
            println!("\u{2713} No issues found.");
        } else {
            println!("\u{26A0} {} issue(s) found:", issues.len());
            println!();
            for (i, issue) in issues.iter().enumerate() {
                println!("  {}. [{}] {}", i + 1, issue.issue_type, issue.location);
                println!("     {}", issue.message);
                println!();
            }
        }
    }

    fn print_json(&self, issues: &[ValidationIssue]) -> anyhow::Result<()> {
        let output = ValidationOutput {
            issue_count: issues.len(),
            issues: issues.to_vec(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }
}

fn warning_issue(disposal: &DisposalRecord, warning: &DisposalWarning) -> ValidationIssue {
    let location = format!(
        "disposal of {} on {}",
        disposal.asset,
        disposal.disposed_date().format("%Y-%m-%d")
    );
    match warning {
        DisposalWarning::InsufficientLots {
            available,
            required,
        } => ValidationIssue {
            issue_type: "InsufficientLots".to_string(),
            location,
            message: format!(
                "ledger held only {} of {} units - partial cost basis ${:.2}",
                format_quantity(*available),
                format_quantity(*required),
                disposal.cost_basis
            ),
        },
        DisposalWarning::MissingPrice { date } => ValidationIssue {
            issue_type: "MissingPrice".to_string(),
            location,
            message: format!(
                "no daily close for {} - transfer-out valued at the fallback price",
                date.format("%Y-%m-%d")
            ),
        },
    }
}

fn format_quantity(qty: Decimal) -> String {
    let s = format!("{:.8}", qty);
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}
