use serde::Deserialize;

use crate::error::Error;

/// Default size of one fixed-point weight unit, in nats.
pub const DEFAULT_WEIGHT_QUANTUM: f64 = 1e-12;

/// Default tolerance a cycle's rate product must clear above 1.0.
pub const DEFAULT_GAIN_TOLERANCE: f64 = 1e-9;

/// Fixed-point log weight. One unit equals `NumericPolicy::weight_quantum` nats.
pub type FixedWeight = i64;

/// The single rounding policy applied to one query.
///
/// Weights are `-ln(rate)` quantized to integer multiples of `weight_quantum`,
/// so relaxation compares exact integers and never flips on representation
/// error. Quantization rounds up, so a loop can only look less profitable
/// than it is: rates that are mutually consistent never form a negative
/// cycle. Cycle gains are evaluated on the original rates and must exceed
/// `1 + gain_tolerance`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct NumericPolicy {
    pub weight_quantum: f64,
    pub gain_tolerance: f64,
}

impl Default for NumericPolicy {
    fn default() -> Self {
        Self {
            weight_quantum: DEFAULT_WEIGHT_QUANTUM,
            gain_tolerance: DEFAULT_GAIN_TOLERANCE,
        }
    }
}

impl NumericPolicy {
    pub fn new(weight_quantum: f64, gain_tolerance: f64) -> Result<Self, Error> {
        let policy = Self {
            weight_quantum,
            gain_tolerance,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(self.weight_quantum.is_finite() && self.weight_quantum > 0.0) {
            return Err(Error::InvalidPolicy(format!(
                "weight_quantum must be finite and positive, got {}",
                self.weight_quantum
            )));
        }
        if !(self.gain_tolerance.is_finite() && self.gain_tolerance > 0.0) {
            return Err(Error::InvalidPolicy(format!(
                "gain_tolerance must be finite and positive, got {}",
                self.gain_tolerance
            )));
        }
        Ok(())
    }

    /// Checks the policy can resolve every gain above the tolerance on a
    /// graph of `num_nodes` currencies.
    ///
    /// Each edge weight is rounded up by less than one quantum, so a loop of
    /// up to `num_nodes` edges loses less than `num_nodes * weight_quantum`
    /// nats. That loss must not exceed `ln(1 + gain_tolerance)`, otherwise a
    /// loop just above the tolerance can round to a non-negative weight and
    /// never be found.
    pub fn validate_for_nodes(&self, num_nodes: usize) -> Result<(), Error> {
        self.validate()?;

        let rounding_loss = self.weight_quantum * num_nodes as f64;
        if rounding_loss > self.gain_tolerance.ln_1p() {
            return Err(Error::InvalidPolicy(format!(
                "weight_quantum {} is too coarse for gain_tolerance {} on {} currencies",
                self.weight_quantum, self.gain_tolerance, num_nodes
            )));
        }
        Ok(())
    }

    /// Converts a positive finite rate into its fixed-point weight `-ln(rate)`,
    /// rounded toward +infinity.
    pub fn weight_of(&self, rate: f64) -> FixedWeight {
        let nats = -rate.ln();
        (nats / self.weight_quantum).ceil() as FixedWeight
    }

    /// Inverse of [`weight_of`](Self::weight_of): `e^(-weight)`.
    pub fn rate_of(&self, weight: FixedWeight) -> f64 {
        (-(weight as f64) * self.weight_quantum).exp()
    }

    /// Compounds `rates` by plain multiplication, starting at 1.
    pub fn compound<I>(&self, rates: I) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        rates.into_iter().fold(1.0, |product, rate| product * rate)
    }

    /// The epsilon gate: true only when `product` clears `1 + gain_tolerance`.
    pub fn is_real_gain(&self, product: f64) -> bool {
        product > 1.0 + self.gain_tolerance
    }
}
