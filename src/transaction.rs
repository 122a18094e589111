use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("quantity must be non-zero")]
    ZeroQuantity,
    #[error("invalid timestamp (timezone required): {0}")]
    InvalidTimestamp(String),
}

/// How a transaction participates in the calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    /// Acquired with a cost amount - creates a lot
    Purchase,
    /// Disposed with a proceeds amount - realizes gain/loss against lots
    Sale,
    /// Disposed with no proceeds - left custody, valued at a market price
    TransferOut,
    /// Acquired with no cost amount - carries no basis information
    TransferIn,
}

impl TxKind {
    pub fn display(&self) -> &'static str {
        match self {
            TxKind::Purchase => "Purchase",
            TxKind::Sale => "Sale",
            TxKind::TransferOut => "Transfer-out",
            TxKind::TransferIn => "Transfer-in",
        }
    }
}

impl std::fmt::Display for TxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// A single entry from the transaction export
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub timestamp: DateTime<Utc>,
    /// Signed: positive = acquired, negative = disposed. Never zero.
    pub quantity: Decimal,
    /// Gross cost (acquisitions) or gross proceeds (disposals)
    pub amount: Option<Decimal>,
    pub fee: Option<Decimal>,
    pub to_address: Option<String>,
    pub tx_hash: Option<String>,
}

impl Transaction {
    /// Calendar date of the transaction (time-of-day stripped)
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    pub fn fee_or_zero(&self) -> Decimal {
        self.fee.unwrap_or(Decimal::ZERO)
    }

    pub fn kind(&self) -> TxKind {
        match (self.quantity.is_sign_positive(), self.amount.is_some()) {
            (true, true) => TxKind::Purchase,
            (true, false) => TxKind::TransferIn,
            (false, true) => TxKind::Sale,
            (false, false) => TxKind::TransferOut,
        }
    }
}

/// CSV row shape (Coinbase-style transaction export)
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Amount")]
    pub amount: Decimal,
    #[serde(rename = "Transfer Total")]
    pub transfer_total: Option<Decimal>,
    #[serde(rename = "Transfer Fee")]
    pub transfer_fee: Option<Decimal>,
    #[serde(rename = "To", default)]
    pub to: Option<String>,
    #[serde(rename = "Tx Hash", default)]
    pub tx_hash: Option<String>,
}

impl TryFrom<TransactionRecord> for Transaction {
    type Error = RecordError;

    fn try_from(record: TransactionRecord) -> Result<Self, Self::Error> {
        if record.amount.is_zero() {
            return Err(RecordError::ZeroQuantity);
        }
        let timestamp = parse_timestamp(&record.timestamp)?;
        Ok(Transaction {
            timestamp,
            quantity: record.amount,
            amount: record.transfer_total,
            fee: record.transfer_fee,
            to_address: none_if_empty(record.to),
            tx_hash: none_if_empty(record.tx_hash),
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, RecordError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S %z") {
        return Ok(dt.with_timezone(&Utc));
    }
    Err(RecordError::InvalidTimestamp(s.to_string()))
}

fn none_if_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// A row that failed to decode, kept for diagnostics
#[derive(Debug, Clone)]
pub struct RejectedRecord {
    /// 1-based row number in the source file, header included
    pub row: usize,
    pub reason: String,
}

/// Decoded transaction list plus the rows that were rejected
#[derive(Debug, Clone, Default)]
pub struct Import {
    pub transactions: Vec<Transaction>,
    pub rejected: Vec<RejectedRecord>,
}

/// Decode the transaction CSV.
///
/// Input order is preserved: the FIFO ledger assumes rows are chronological,
/// so no sorting happens here. Malformed rows are rejected individually with
/// a diagnostic; they never abort the import.
pub fn read_csv<R: Read>(reader: R) -> Import {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut transactions = Vec::new();
    let mut rejected = Vec::new();

    for (i, result) in rdr.deserialize::<TransactionRecord>().enumerate() {
        let row = i + 2; // row 1 is the header
        let reason = match result {
            Ok(record) => match Transaction::try_from(record) {
                Ok(tx) => {
                    transactions.push(tx);
                    continue;
                }
                Err(err) => err.to_string(),
            },
            Err(err) => err.to_string(),
        };
        log::warn!("rejecting row {}: {}", row, reason);
        rejected.push(RejectedRecord { row, reason });
    }

    Import {
        transactions,
        rejected,
    }
}
