pub mod report;
pub mod transactions;
pub mod validate;

use crate::prices::PriceTable;
use crate::transaction::{self, Import};
use anyhow::Context;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Read the transaction CSV (or stdin with "-")
pub fn read_transactions(path: &Path) -> anyhow::Result<Import> {
    if path.as_os_str() == "-" {
        let mut buffer = Vec::new();
        io::stdin().lock().read_to_end(&mut buffer)?;
        if buffer.is_empty() {
            anyhow::bail!("No input received. Provide a file or pipe data to stdin.");
        }
        Ok(transaction::read_csv(io::Cursor::new(buffer)))
    } else {
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        Ok(transaction::read_csv(BufReader::new(file)))
    }
}

/// Read the historical price CSV
pub fn read_prices(path: &Path, fallback: Decimal) -> anyhow::Result<PriceTable> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let table = PriceTable::read_csv(BufReader::new(file), fallback)?;
    if table.is_empty() {
        log::warn!("price table is empty; every transfer-out will use the fallback price");
    }
    log::debug!(
        "loaded {} price entries (fallback {})",
        table.len(),
        table.fallback()
    );
    Ok(table)
}
