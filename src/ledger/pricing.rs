//! Token cost estimation
//!
//! The same function prices a submission for the user and debits it at the
//! billing boundary, so the displayed price is the charged price.

use serde_json::{Map, Value};

use crate::config::BillingConfig;
use crate::registry::ModelDescriptor;

/// Charged when a model has no known base price
pub const FALLBACK_COST: u64 = 1;

/// Input parameter holding the requested number of outputs
pub const OUTPUT_COUNT_PARAM: &str = "num_images";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub markup_factor: f64,
    /// USD value of one token
    pub unit_value: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            markup_factor: 1.2,
            unit_value: 0.01,
        }
    }
}

impl From<&BillingConfig> for Pricing {
    fn from(config: &BillingConfig) -> Self {
        Self {
            markup_factor: config.markup_factor,
            unit_value: config.usd_per_token,
        }
    }
}

/// Requested output count: numeric `num_images` clamped to at least 1, else 1
pub fn output_count(inputs: &Map<String, Value>) -> u64 {
    match inputs.get(OUTPUT_COUNT_PARAM).and_then(Value::as_f64) {
        Some(n) if n >= 1.0 => n.floor() as u64,
        _ => 1,
    }
}

impl Pricing {
    /// Tokens charged for one invocation of `model` with `inputs`
    pub fn estimate_cost(&self, model: &ModelDescriptor, inputs: &Map<String, Value>) -> u64 {
        let Some(base) = model.base_price_cost else {
            return FALLBACK_COST;
        };

        let raw = base * self.markup_factor / self.unit_value * output_count(inputs) as f64;
        // Trim float noise so 6.000000000000001 does not become 7
        let trimmed = (raw * 1e9).round() / 1e9;
        (trimmed.ceil() as u64).max(1)
    }

    /// Sum of per-model estimates for one submission event
    pub fn estimate_total<'a, I>(&self, models: I, inputs: &Map<String, Value>) -> u64
    where
        I: IntoIterator<Item = &'a ModelDescriptor>,
    {
        models.into_iter().map(|m| self.estimate_cost(m, inputs)).sum()
    }
}
