//! Report command - calculate and render the realized gains report

use crate::cmd::{read_prices, read_transactions};
use crate::tax::{calculate_fifo, DisposalRecord, FifoConfig, FifoReport};
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct ReportCommand {
    /// Transaction CSV file (or "-" for stdin)
    #[arg(short, long)]
    transactions: PathBuf,

    /// Historical daily close prices CSV
    #[arg(short, long)]
    prices: PathBuf,

    /// Asset label for the report
    #[arg(short, long, default_value = "BTC")]
    asset: String,

    /// Price used when a date is missing from the price table
    #[arg(long, default_value = "2217.79")]
    fallback_price: Decimal,

    /// Days held beyond which a disposal is long-term
    #[arg(long, default_value_t = 365)]
    long_term_days: i64,

    /// Output as CSV instead of formatted table
    #[arg(long)]
    csv: bool,

    /// Output as JSON instead of formatted table
    #[arg(long)]
    json: bool,
}

impl ReportCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let import = read_transactions(&self.transactions)?;
        if !import.rejected.is_empty() {
            log::warn!(
                "{} row(s) rejected during import; run `fifotax validate` for details",
                import.rejected.len()
            );
        }
        let prices = read_prices(&self.prices, self.fallback_price)?;
        let config = FifoConfig {
            asset: self.asset.clone(),
            long_term_days: self.long_term_days,
        };
        let report = calculate_fifo(&import.transactions, &prices, &config);

        if self.csv {
            report.write_csv(io::stdout())?;
            Ok(())
        } else if self.json {
            self.print_json(&report)
        } else {
            self.print_table(&report);
            Ok(())
        }
    }

    fn print_table(&self, report: &FifoReport) {
        println!();
        println!("REALIZED GAINS ({})", self.asset);
        println!();

        if report.disposals.is_empty() {
            println!("No disposals found");
        } else {
            let rows: Vec<DisposalRow> = report.disposals.iter().map(DisposalRow::from).collect();
            let table = Table::new(rows)
                .with(Style::rounded())
                .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
                .to_string();
            println!("{}", table);
        }

        println!();
        println!("Disposals: {}", report.disposals.len());
        println!(
            "Proceeds: {} | Cost Basis: {} | Realized Gain/Loss: {}",
            format_usd(report.total_proceeds()),
            format_usd(report.total_cost_basis()),
            format_usd_signed(report.total_gain())
        );
        if !report.ledger.is_empty() {
            println!(
                "Unconsumed lots: {} ({} {} remaining)",
                report.ledger.len(),
                format_quantity(report.ledger.total_remaining()),
                self.asset
            );
        }
        let flagged = report.disposals.iter().filter(|d| d.has_warnings()).count();
        if flagged > 0 {
            println!(
                "\u{26A0} {} disposal(s) have data-quality warnings; run `fifotax validate`",
                flagged
            );
        }
        println!();
    }

    fn print_json(&self, report: &FifoReport) -> anyhow::Result<()> {
        let data = ReportData {
            asset: self.asset.clone(),
            disposal_count: report.disposals.len(),
            total_proceeds: format!("{:.2}", report.total_proceeds()),
            total_cost_basis: format!("{:.2}", report.total_cost_basis()),
            total_gain: format!("{:.2}", report.total_gain()),
            disposals: report.disposals.iter().map(DisposalJson::from).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&data)?);
        Ok(())
    }
}

/// Row for the rendered report table
#[derive(Debug, Clone, Tabled)]
struct DisposalRow {
    #[tabled(rename = "Asset")]
    asset: String,
    #[tabled(rename = "Date Acquired")]
    acquired: String,
    #[tabled(rename = "Date Sold")]
    disposed: String,
    #[tabled(rename = "Proceeds (USD)")]
    proceeds: String,
    #[tabled(rename = "Cost Basis (USD)")]
    cost_basis: String,
    #[tabled(rename = "Holding Period")]
    holding_period: String,
    #[tabled(rename = "Gain/Loss (USD)")]
    gain: String,
    #[tabled(rename = "To Address")]
    to_address: String,
}

impl From<&DisposalRecord> for DisposalRow {
    fn from(d: &DisposalRecord) -> Self {
        DisposalRow {
            asset: d.asset.clone(),
            acquired: d
                .acquired
                .map(|a| a.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            disposed: d.disposed_date().format("%Y-%m-%d").to_string(),
            proceeds: format_usd(d.proceeds),
            cost_basis: format_usd(d.cost_basis),
            holding_period: d.holding_period.display().to_string(),
            gain: format_usd_signed(d.gain),
            to_address: d.to_address.clone().unwrap_or_default(),
        }
    }
}

/// Report shape for JSON output
#[derive(Debug, Serialize)]
struct ReportData {
    asset: String,
    disposal_count: usize,
    total_proceeds: String,
    total_cost_basis: String,
    total_gain: String,
    disposals: Vec<DisposalJson>,
}

#[derive(Debug, Serialize)]
struct DisposalJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    date_acquired: Option<String>,
    date_sold: String,
    proceeds: String,
    cost_basis: String,
    holding_period: String,
    gain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    to_address: Option<String>,
}

impl From<&DisposalRecord> for DisposalJson {
    fn from(d: &DisposalRecord) -> Self {
        DisposalJson {
            date_acquired: d.acquired.map(|a| a.format("%Y-%m-%d").to_string()),
            date_sold: d.disposed_date().format("%Y-%m-%d").to_string(),
            proceeds: format!("{:.2}", d.proceeds),
            cost_basis: format!("{:.2}", d.cost_basis),
            holding_period: d.holding_period.display().to_string(),
            gain: format!("{:.2}", d.gain),
            tx_hash: d.tx_hash.clone(),
            to_address: d.to_address.clone(),
        }
    }
}

fn format_usd(amount: Decimal) -> String {
    format!("${:.2}", amount)
}

fn format_usd_signed(amount: Decimal) -> String {
    if amount < Decimal::ZERO {
        format!("-${:.2}", amount.abs())
    } else {
        format!("${:.2}", amount)
    }
}

fn format_quantity(qty: Decimal) -> String {
    let s = format!("{:.8}", qty);
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}
