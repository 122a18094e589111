//! Transactions command - decoded transaction listing with classification

use crate::cmd::read_transactions;
use crate::transaction::{Transaction, TxKind};
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use std::io;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct TransactionsCommand {
    /// Transaction CSV file. Reads from stdin if not specified.
    #[arg(default_value = "-")]
    file: PathBuf,

    /// Filter by transaction kind
    #[arg(short, long, value_enum)]
    kind: Option<KindFilter>,

    /// Output as CSV instead of formatted table
    #[arg(long)]
    csv: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindFilter {
    Purchase,
    Sale,
    TransferOut,
    TransferIn,
}

impl KindFilter {
    fn matches(&self, kind: TxKind) -> bool {
        matches!(
            (self, kind),
            (KindFilter::Purchase, TxKind::Purchase)
                | (KindFilter::Sale, TxKind::Sale)
                | (KindFilter::TransferOut, TxKind::TransferOut)
                | (KindFilter::TransferIn, TxKind::TransferIn)
        )
    }
}

impl TransactionsCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let import = read_transactions(&self.file)?;
        if !import.rejected.is_empty() {
            log::warn!("{} row(s) rejected during import", import.rejected.len());
        }

        let rows: Vec<TransactionRow> = import
            .transactions
            .iter()
            .filter(|tx| self.kind.is_none_or(|k| k.matches(tx.kind())))
            .enumerate()
            .map(|(i, tx)| TransactionRow::new(i + 1, tx))
            .collect();

        if self.csv {
            self.write_csv(&rows)
        } else {
            self.print_table(&rows);
            Ok(())
        }
    }

    fn print_table(&self, rows: &[TransactionRow]) {
        if rows.is_empty() {
            println!("No transactions found matching filters");
            return;
        }

        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }

    fn write_csv(&self, rows: &[TransactionRow]) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_writer(io::stdout());
        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Row for the transaction listing
#[derive(Debug, Clone, Tabled, serde::Serialize)]
struct TransactionRow {
    #[tabled(rename = "#")]
    #[serde(rename = "row_num")]
    row_num: String,

    #[tabled(rename = "Timestamp")]
    timestamp: String,

    #[tabled(rename = "Kind")]
    kind: String,

    #[tabled(rename = "Quantity")]
    quantity: String,

    #[tabled(rename = "Amount (USD)")]
    amount: String,

    #[tabled(rename = "Fee (USD)")]
    fee: String,

    #[tabled(rename = "To Address")]
    to_address: String,
}

impl TransactionRow {
    fn new(row_num: usize, tx: &Transaction) -> Self {
        TransactionRow {
            row_num: row_num.to_string(),
            timestamp: tx.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            kind: tx.kind().display().to_string(),
            quantity: format_quantity(tx.quantity),
            amount: tx
                .amount
                .map(|a| format!("{:.2}", a))
                .unwrap_or_default(),
            fee: tx.fee.map(|f| format!("{:.2}", f)).unwrap_or_default(),
            to_address: tx.to_address.clone().unwrap_or_default(),
        }
    }
}

fn format_quantity(qty: Decimal) -> String {
    let s = format!("{:.8}", qty);
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}
