use serde::Serialize;

/// Opaque currency identifier, usually an ISO code such as `USD`.
pub type Currency = String;

/// Raw edge as supplied by a rate snapshot: `(from, to, rate)` by node index.
pub type Edge = (usize, usize, f64);

/// An accepted arbitrage loop.
///
/// `cycle` is closed: the first currency repeats as the last one.
/// `rate_product` is the compounded product of the original rates along
/// the loop, so one unit of the first currency turns into `rate_product`
/// units after a full round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArbitrageResult {
    pub cycle: Vec<Currency>,
    pub rate_product: f64,
}

impl ArbitrageResult {
    /// Compounded gain as a ratio (`product - 1`).
    pub fn gain(&self) -> f64 {
        self.rate_product - 1.0
    }

    /// Compounded gain in percent (`(product - 1) * 100`).
    pub fn gain_percent(&self) -> f64 {
        self.gain() * 100.0
    }

    /// Number of conversions in the loop.
    pub fn hop_count(&self) -> usize {
        self.cycle.len().saturating_sub(1)
    }
}

/// Best conversion from one currency to another when no arbitrage is present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionResult {
    pub path: Vec<Currency>,
    pub best_rate: f64,
}
