use csv::ReaderBuilder;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use tracing::{debug, error};

use super::error::Error;
use common::types::Currency;
use fx_arb_core::RateTable;

/// One directed quote: `1 from = rate to`.
#[derive(Debug, Deserialize)]
pub struct RateRecord {
    pub from: String,
    pub to: String,
    pub rate: f64,
}

/// One currency quoted against the configured base.
#[derive(Debug, Deserialize)]
pub struct QuoteRecord {
    pub currency: String,
    pub rate: f64,
}

/// A loaded snapshot: the currency set in graph order plus its rates.
#[derive(Debug)]
pub struct Snapshot {
    pub currencies: Vec<Currency>,
    pub rates: RateTable,
}

/// Reads rate snapshots from CSV files with a header row.
///
/// Extra columns are ignored. Values are parsed but not validated here;
/// graph construction rejects bad rates.
pub struct CsvLoader {
    path: PathBuf,
}

impl CsvLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvLoader { path: path.into() }
    }

    fn open(&self) -> Result<File, Error> {
        File::open(&self.path).map_err(|e| {
            error!(path = %self.path.display(), error = %e, "failed to open rate file");
            Error::IoError(e)
        })
    }

    /// Loads a `from,to,rate` file. Currencies are taken in sorted order.
    pub fn load_rates(&self) -> Result<Snapshot, Error> {
        let rates = parse_rates(self.open()?)?;
        let currencies = rates.currencies();

        debug!(
            path = %self.path.display(),
            currencies = currencies.len(),
            pairs = rates.len(),
            "loaded rate table"
        );
        Ok(Snapshot { currencies, rates })
    }

    /// Loads a `currency,rate` file of quotes against `base` and derives
    /// every cross rate. Currencies keep file order.
    pub fn load_quotes(&self, base: &str) -> Result<Snapshot, Error> {
        let quotes = parse_quotes(self.open()?)?;
        let rates = RateTable::from_base_quotes(base, &quotes)?;
        let currencies = quotes.into_iter().map(|(currency, _)| currency).collect();

        debug!(path = %self.path.display(), base, pairs = rates.len(), "loaded base quotes");
        Ok(Snapshot { currencies, rates })
    }
}

fn parse_rates<R: Read>(reader: R) -> Result<RateTable, Error> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut table = RateTable::new();
    for result in rdr.deserialize() {
        let record: RateRecord = result?;
        table.insert(record.from, record.to, record.rate);
    }
    Ok(table)
}

fn parse_quotes<R: Read>(reader: R) -> Result<Vec<(Currency, f64)>, Error> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut quotes = Vec::new();
    for result in rdr.deserialize() {
        let record: QuoteRecord = result?;
        quotes.push((record.currency, record.rate));
    }
    Ok(quotes)
}
