use std::collections::HashMap;

use common::error::Error;
use common::types::Currency;

/// Read-only rate snapshot a graph is built from.
///
/// `rate(from, to)` returns how many units of `to` one unit of `from` buys,
/// or `None` when the pair is not quoted. Validation of the returned value
/// happens at graph construction, so an absent pair and an invalid rate stay
/// distinguishable.
pub trait RateSource {
    fn rate(&self, from: &str, to: &str) -> Option<f64>;
}

impl<F> RateSource for F
where
    F: Fn(&str, &str) -> Option<f64>,
{
    fn rate(&self, from: &str, to: &str) -> Option<f64> {
        self(from, to)
    }
}

/// Owned snapshot of directed rates keyed by currency pair.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: HashMap<Currency, HashMap<Currency, f64>>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `from -> to`, replacing any earlier value for the pair.
    pub fn insert(&mut self, from: impl Into<Currency>, to: impl Into<Currency>, rate: f64) {
        self.rates
            .entry(from.into())
            .or_default()
            .insert(to.into(), rate);
    }

    /// Builds cross rates from quotes of each currency against a common base.
    ///
    /// Each quote is "units of currency per one unit of `base`", so the cross
    /// rate is `quote[to] / quote[from]`. The diagonal is left out.
    pub fn from_base_quotes<S>(base: &str, quotes: &[(S, f64)]) -> Result<Self, Error>
    where
        S: AsRef<str>,
    {
        for (currency, quote) in quotes {
            if !(quote.is_finite() && *quote > 0.0) {
                return Err(Error::InvalidRate {
                    from: base.to_string(),
                    to: currency.as_ref().to_string(),
                    rate: *quote,
                });
            }
        }

        let mut table = Self::new();
        for (from, from_quote) in quotes {
            for (to, to_quote) in quotes {
                if from.as_ref() != to.as_ref() {
                    table.insert(from.as_ref(), to.as_ref(), to_quote / from_quote);
                }
            }
        }
        Ok(table)
    }

    /// Number of quoted pairs.
    pub fn len(&self) -> usize {
        self.rates.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every currency appearing on either side of a quote, sorted.
    pub fn currencies(&self) -> Vec<Currency> {
        let mut all: Vec<Currency> = self
            .rates
            .iter()
            .flat_map(|(from, row)| std::iter::once(from).chain(row.keys()))
            .cloned()
            .collect();
        all.sort();
        all.dedup();
        all
    }
}

impl RateSource for RateTable {
    fn rate(&self, from: &str, to: &str) -> Option<f64> {
        self.rates.get(from).and_then(|row| row.get(to)).copied()
    }
}

impl<F, T> FromIterator<(F, T, f64)> for RateTable
where
    F: Into<Currency>,
    T: Into<Currency>,
{
    fn from_iter<I: IntoIterator<Item = (F, T, f64)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (from, to, rate) in iter {
            table.insert(from, to, rate);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup() {
        let mut table = RateTable::new();
        table.insert("USD", "EUR", 0.85);
        table.insert("EUR", "USD", 1.17);

        assert_eq!(table.rate("USD", "EUR"), Some(0.85));
        assert_eq!(table.rate("EUR", "USD"), Some(1.17));
        assert_eq!(table.rate("USD", "JPY"), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn later_insert_replaces_earlier() {
        let table: RateTable = [("A", "B", 1.0), ("A", "B", 2.0)].into_iter().collect();
        assert_eq!(table.rate("A", "B"), Some(2.0));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn currencies_are_sorted_and_unique() {
        let table: RateTable = [("USD", "EUR", 0.85), ("EUR", "JPY", 130.0)]
            .into_iter()
            .collect();
        assert_eq!(table.currencies(), vec!["EUR", "JPY", "USD"]);
    }

    #[test]
    fn base_quotes_produce_consistent_cross_rates() {
        let quotes = [("USD", 1.0), ("EUR", 0.8), ("JPY", 150.0)];
        let table = RateTable::from_base_quotes("USD", &quotes).unwrap();

        assert_eq!(table.len(), 6);
        assert_eq!(table.rate("USD", "USD"), None);
        assert!((table.rate("EUR", "JPY").unwrap() - 187.5).abs() < 1e-9);
        assert!((table.rate("JPY", "USD").unwrap() - 1.0 / 150.0).abs() < 1e-12);
    }

    #[test]
    fn base_quotes_reject_non_positive_values() {
        let quotes = [("USD", 1.0), ("EUR", 0.0)];
        let result = RateTable::from_base_quotes("USD", &quotes);

        assert!(matches!(result, Err(Error::InvalidRate { ref to, .. }) if to == "EUR"));
    }

    #[test]
    fn closures_act_as_rate_sources() {
        let flat = |from: &str, to: &str| (from != to).then_some(1.0);
        assert_eq!(flat.rate("A", "B"), Some(1.0));
        assert_eq!(flat.rate("A", "A"), None);
    }
}
