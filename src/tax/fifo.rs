use crate::prices::PriceTable;
use crate::transaction::{Transaction, TxKind};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::VecDeque;
use std::io::Write;

/// Run parameters. All policy knobs are passed in explicitly; nothing is
/// read from the environment.
#[derive(Debug, Clone)]
pub struct FifoConfig {
    /// Asset label carried into every disposal record
    pub asset: String,
    /// Days held beyond which a disposal is long-term
    pub long_term_days: i64,
}

impl Default for FifoConfig {
    fn default() -> Self {
        FifoConfig {
            asset: "BTC".to_string(),
            long_term_days: 365,
        }
    }
}

/// A single acquisition's unconsumed remainder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lot {
    pub remaining: Decimal,
    pub unit_cost: Decimal,
    pub acquired: DateTime<Utc>,
}

/// Result of drawing a quantity from the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumption {
    pub cost_basis: Decimal,
    /// Acquisition time of the oldest lot touched, if any
    pub acquired: Option<DateTime<Utc>>,
    /// Quantity that could not be matched against any lot
    pub unmatched: Decimal,
}

/// Ordered queue of acquisition lots, oldest first.
///
/// Mutated only by `push` and `consume`; private to one run.
#[derive(Debug, Clone, Default)]
pub struct LotLedger {
    lots: VecDeque<Lot>,
}

impl LotLedger {
    /// Enqueue an acquisition. `total_cost` is spread evenly per unit.
    pub fn push(&mut self, quantity: Decimal, total_cost: Decimal, acquired: DateTime<Utc>) {
        let unit_cost = total_cost / quantity;
        log::debug!(
            "ledger ADD: qty={} unit_cost={} acquired={}",
            quantity,
            unit_cost,
            acquired
        );
        self.lots.push_back(Lot {
            remaining: quantity,
            unit_cost,
            acquired,
        });
    }

    /// Draw `needed` units from the oldest lots.
    ///
    /// Stops when satisfied or when the ledger runs dry. An under-supplied
    /// draw is not an error: the partial basis accumulated so far is
    /// returned, with the shortfall in `unmatched`. Each unit is consumed by
    /// at most one draw, always oldest-first.
    pub fn consume(&mut self, needed: Decimal) -> Consumption {
        debug_assert!(needed > Decimal::ZERO);
        let mut needed = needed;
        let mut cost_basis = Decimal::ZERO;
        let mut acquired = None;

        while needed > Decimal::ZERO {
            let Some(oldest) = self.lots.front_mut() else {
                break;
            };
            if acquired.is_none() {
                acquired = Some(oldest.acquired);
            }
            if oldest.remaining <= needed {
                cost_basis += oldest.remaining * oldest.unit_cost;
                needed -= oldest.remaining;
                log::debug!(
                    "ledger CONSUME ALL: qty={} acquired={}",
                    oldest.remaining,
                    oldest.acquired
                );
                self.lots.pop_front();
            } else {
                cost_basis += needed * oldest.unit_cost;
                oldest.remaining -= needed;
                log::debug!(
                    "ledger CONSUME: qty={} left={} acquired={}",
                    needed,
                    oldest.remaining,
                    oldest.acquired
                );
                needed = Decimal::ZERO;
            }
        }

        Consumption {
            cost_basis,
            acquired,
            unmatched: needed,
        }
    }

    pub fn total_remaining(&self) -> Decimal {
        self.lots().map(|lot| lot.remaining).sum()
    }

    pub fn len(&self) -> usize {
        self.lots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    pub fn lots(&self) -> impl Iterator<Item = &Lot> {
        self.lots.iter()
    }
}

/// Holding-period classification for a disposal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldingPeriod {
    LongTerm,
    ShortTerm,
    Unknown,
}

impl HoldingPeriod {
    pub fn display(&self) -> &'static str {
        match self {
            HoldingPeriod::LongTerm => "Long-term",
            HoldingPeriod::ShortTerm => "Short-term",
            HoldingPeriod::Unknown => "Unknown",
        }
    }

    /// Long-term iff held strictly more than `long_term_days`
    fn classify(
        acquired: Option<DateTime<Utc>>,
        disposed: DateTime<Utc>,
        long_term_days: i64,
    ) -> Self {
        match acquired {
            Some(acquired) if (disposed - acquired).num_days() > long_term_days => {
                HoldingPeriod::LongTerm
            }
            Some(_) => HoldingPeriod::ShortTerm,
            None => HoldingPeriod::Unknown,
        }
    }
}

impl std::fmt::Display for HoldingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Data-quality condition attached to a disposal record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisposalWarning {
    /// Ledger held less than the disposed quantity
    InsufficientLots {
        available: Decimal,
        required: Decimal,
    },
    /// No daily close for a transfer-out date; fallback price used
    MissingPrice { date: NaiveDate },
}

/// Outcome of one disposal, immutable once created
#[derive(Debug, Clone, PartialEq)]
pub struct DisposalRecord {
    pub asset: String,
    /// Acquisition date of the earliest lot touched, absent when the ledger
    /// was already empty
    pub acquired: Option<NaiveDate>,
    pub disposed: DateTime<Utc>,
    /// Net proceeds; zero for transfer-outs
    pub proceeds: Decimal,
    pub cost_basis: Decimal,
    pub holding_period: HoldingPeriod,
    pub gain: Decimal,
    pub tx_hash: Option<String>,
    pub to_address: Option<String>,
    pub warnings: Vec<DisposalWarning>,
}

impl DisposalRecord {
    pub fn disposed_date(&self) -> NaiveDate {
        self.disposed.date_naive()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// CSV record for disposal output
#[derive(Debug, Serialize)]
pub struct DisposalCsvRecord {
    pub asset: String,
    pub date_acquired: String,
    pub date_sold: String,
    pub proceeds_usd: String,
    pub cost_basis_usd: String,
    pub holding_period: String,
    pub gain_loss_usd: String,
    pub tx_hash: String,
    pub to_address: String,
}

impl From<&DisposalRecord> for DisposalCsvRecord {
    fn from(d: &DisposalRecord) -> Self {
        DisposalCsvRecord {
            asset: d.asset.clone(),
            date_acquired: d
                .acquired
                .map(|a| a.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            date_sold: d.disposed_date().format("%Y-%m-%d").to_string(),
            proceeds_usd: d.proceeds.round_dp(2).to_string(),
            cost_basis_usd: d.cost_basis.round_dp(2).to_string(),
            holding_period: d.holding_period.display().to_string(),
            gain_loss_usd: d.gain.round_dp(2).to_string(),
            tx_hash: d.tx_hash.clone().unwrap_or_default(),
            to_address: d.to_address.clone().unwrap_or_default(),
        }
    }
}

/// Report output failure. Fatal, unlike the computation-layer diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to write report: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush report: {0}")]
    Io(#[from] std::io::Error),
}

/// Finished report: disposal records sorted by disposal date plus the lots
/// left unconsumed at the end of the run
#[derive(Debug, Clone)]
pub struct FifoReport {
    /// Sorted by disposal date ascending; ties keep processing order
    pub disposals: Vec<DisposalRecord>,
    pub ledger: LotLedger,
}

impl FifoReport {
    pub fn total_gain(&self) -> Decimal {
        self.disposals.iter().map(|d| d.gain).sum()
    }

    pub fn total_proceeds(&self) -> Decimal {
        self.disposals.iter().map(|d| d.proceeds).sum()
    }

    pub fn total_cost_basis(&self) -> Decimal {
        self.disposals.iter().map(|d| d.cost_basis).sum()
    }

    pub fn warnings(&self) -> impl Iterator<Item = (&DisposalRecord, &DisposalWarning)> {
        self.disposals
            .iter()
            .flat_map(|d| d.warnings.iter().map(move |w| (d, w)))
    }

    /// Write disposals to CSV
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), SinkError> {
        let mut wtr = csv::Writer::from_writer(writer);
        for disposal in &self.disposals {
            let record: DisposalCsvRecord = disposal.into();
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Run the FIFO calculation over an in-memory transaction list.
///
/// Two passes: the ledger is seeded from every priced acquisition in input
/// order, then disposals are walked in input order. Rows are assumed
/// chronological; if they are not, matching degrades to FIFO-by-input-order.
pub fn calculate_fifo(
    transactions: &[Transaction],
    prices: &PriceTable,
    config: &FifoConfig,
) -> FifoReport {
    let mut ledger = LotLedger::default();
    for tx in transactions {
        match tx.kind() {
            TxKind::Purchase => {
                let cost = tx.amount.unwrap_or(Decimal::ZERO) + tx.fee_or_zero();
                ledger.push(tx.quantity, cost, tx.timestamp);
            }
            TxKind::TransferIn => {
                log::warn!(
                    "inbound transfer of {} on {} carries no cost; no lot created",
                    tx.quantity,
                    tx.date()
                );
            }
            TxKind::Sale | TxKind::TransferOut => {}
        }
    }

    let mut disposals = Vec::new();
    for tx in transactions {
        let record = match tx.kind() {
            TxKind::Sale => process_sale(tx, &mut ledger, config),
            TxKind::TransferOut => process_transfer_out(tx, &mut ledger, prices, config),
            TxKind::Purchase | TxKind::TransferIn => continue,
        };
        disposals.push(record);
    }

    // Stable: same-date disposals keep processing order
    disposals.sort_by_key(|d| d.disposed_date());

    FifoReport { disposals, ledger }
}

fn process_sale(tx: &Transaction, ledger: &mut LotLedger, config: &FifoConfig) -> DisposalRecord {
    let quantity = tx.quantity.abs();
    let proceeds = tx.amount.unwrap_or(Decimal::ZERO) - tx.fee_or_zero();
    let consumption = ledger.consume(quantity);

    let mut warnings = Vec::new();
    if consumption.unmatched > Decimal::ZERO {
        warnings.push(DisposalWarning::InsufficientLots {
            available: quantity - consumption.unmatched,
            required: quantity,
        });
    }

    DisposalRecord {
        asset: config.asset.clone(),
        acquired: consumption.acquired.map(|a| a.date_naive()),
        disposed: tx.timestamp,
        proceeds,
        cost_basis: consumption.cost_basis,
        holding_period: HoldingPeriod::classify(
            consumption.acquired,
            tx.timestamp,
            config.long_term_days,
        ),
        gain: proceeds - consumption.cost_basis,
        tx_hash: tx.tx_hash.clone(),
        to_address: tx.to_address.clone(),
        warnings,
    }
}

fn process_transfer_out(
    tx: &Transaction,
    ledger: &mut LotLedger,
    prices: &PriceTable,
    config: &FifoConfig,
) -> DisposalRecord {
    let quantity = tx.quantity.abs();

    let mut warnings = Vec::new();
    if prices.close(tx.date()).is_none() {
        warnings.push(DisposalWarning::MissingPrice { date: tx.date() });
    }
    let unit_price = prices.price_at(tx.date());

    // The departing value is treated entirely as a realized loss rather than
    // matched against actual lot cost. The ledger is still drained so later
    // disposals cannot re-use these units, and the earliest lot drives the
    // holding period.
    let cost_basis = quantity * unit_price;
    let consumption = ledger.consume(quantity);
    if consumption.unmatched > Decimal::ZERO {
        warnings.push(DisposalWarning::InsufficientLots {
            available: quantity - consumption.unmatched,
            required: quantity,
        });
    }

    DisposalRecord {
        asset: config.asset.clone(),
        acquired: consumption.acquired.map(|a| a.date_naive()),
        disposed: tx.timestamp,
        proceeds: Decimal::ZERO,
        cost_basis,
        holding_period: HoldingPeriod::classify(
            consumption.acquired,
            tx.timestamp,
            config.long_term_days,
        ),
        gain: -cost_basis,
        tx_hash: tx.tx_hash.clone(),
        to_address: tx.to_address.clone(),
        warnings,
    }
}
