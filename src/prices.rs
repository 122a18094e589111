use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;

/// Historical daily closing prices plus a configured fallback.
///
/// A missing date is a policy decision, not a failure: `price_at` falls back
/// to the configured constant and logs a diagnostic.
#[derive(Debug, Clone)]
pub struct PriceTable {
    closes: BTreeMap<NaiveDate, Decimal>,
    fallback: Decimal,
}

/// CSV row shape for the historical price table
#[derive(Debug, Deserialize)]
struct PriceRecord {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Close")]
    close: Decimal,
}

impl PriceTable {
    pub fn new(fallback: Decimal) -> Self {
        PriceTable {
            closes: BTreeMap::new(),
            fallback,
        }
    }

    pub fn insert(&mut self, date: NaiveDate, close: Decimal) {
        self.closes.insert(date, close);
    }

    pub fn fallback(&self) -> Decimal {
        self.fallback
    }

    /// Exact daily close, if the table has one
    pub fn close(&self, date: NaiveDate) -> Option<Decimal> {
        self.closes.get(&date).copied()
    }

    /// Daily close, or the fallback constant when the date is absent
    pub fn price_at(&self, date: NaiveDate) -> Decimal {
        match self.close(date) {
            Some(close) => close,
            None => {
                log::warn!(
                    "no close price for {}, using fallback {}",
                    date,
                    self.fallback
                );
                self.fallback
            }
        }
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn read_csv<R: Read>(reader: R, fallback: Decimal) -> anyhow::Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut table = PriceTable::new(fallback);
        for result in rdr.deserialize::<PriceRecord>() {
            let record = result?;
            let date = NaiveDate::parse_from_str(&record.date, "%Y-%m-%d")
                .with_context(|| format!("invalid price date: {}", record.date))?;
            table.insert(date, record.close);
        }
        Ok(table)
    }
}
