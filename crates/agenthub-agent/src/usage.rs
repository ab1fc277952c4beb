//! Token and cost accounting across gateway calls

use agenthub_core::{Settings, UsageTotals};

/// USD per million tokens.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl Pricing {
    pub fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    pub fn cost(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        (prompt_tokens as f64 / 1_000_000.0) * self.input_per_million
            + (completion_tokens as f64 / 1_000_000.0) * self.output_per_million
    }
}

impl From<&Settings> for Pricing {
    fn from(s: &Settings) -> Self {
        Self::new(s.input_price, s.output_price)
    }
}

/// Running totals. Every field only ever grows.
#[derive(Clone, Copy, Debug, Default)]
pub struct UsageAccumulator {
    totals: UsageTotals,
}

impl UsageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue from totals a previous run left behind.
    pub fn seeded(baseline: UsageTotals) -> Self {
        Self { totals: baseline }
    }

    /// Add one response's usage and return the new totals.
    pub fn record(&mut self, prompt_tokens: u64, completion_tokens: u64, pricing: &Pricing) -> UsageTotals {
        self.totals.input_tokens += prompt_tokens;
        self.totals.output_tokens += completion_tokens;
        self.totals.estimated_cost += pricing.cost(prompt_tokens, completion_tokens).max(0.0);
        self.totals
    }

    pub fn totals(&self) -> UsageTotals {
        self.totals
    }
}
