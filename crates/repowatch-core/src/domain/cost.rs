//! Usage cost reported by the summarizer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rough chars-per-token ratio used when the provider reports no usage.
const CHARS_PER_TOKEN: u64 = 4;
const INPUT_USD_PER_MTOK: f64 = 3.0;
const OUTPUT_USD_PER_MTOK: f64 = 15.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostInfo {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub estimated_cost: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl CostInfo {
    /// Estimate usage from prompt/output sizes.
    pub fn estimated(provider: impl Into<String>, prompt_chars: usize, output_chars: usize) -> Self {
        let input_tokens = prompt_chars as u64 / CHARS_PER_TOKEN;
        let output_tokens = output_chars as u64 / CHARS_PER_TOKEN;
        let estimated_cost = input_tokens as f64 * INPUT_USD_PER_MTOK / 1_000_000.0
            + output_tokens as f64 * OUTPUT_USD_PER_MTOK / 1_000_000.0;
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            estimated_cost,
            provider: Some(provider.into()),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.estimated_cost == 0.0 && self.total_tokens == 0
    }

    /// Accumulate another cost into this one.
    pub fn absorb(&mut self, other: &CostInfo) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.total_tokens += other.total_tokens;
        self.estimated_cost += other.estimated_cost;
        if self.provider.is_none() {
            self.provider = other.provider.clone();
        }
    }
}

/// `($0.012, 4000 tokens)`; empty when nothing was spent.
impl fmt::Display for CostInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.estimated_cost == 0.0 {
            return Ok(());
        }
        if self.estimated_cost < 0.001 {
            write!(f, "($<0.001, {} tokens)", self.total_tokens)
        } else {
            write!(f, "(${:.3}, {} tokens)", self.estimated_cost, self.total_tokens)
        }
    }
}
