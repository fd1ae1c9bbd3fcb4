//! Tier evaluation strategies.
//!
//! A [`TierEvaluator`] maps a bag of usage metrics to a tier id. The engine
//! takes the evaluator as an injected capability, so scoring policies can be
//! swapped without touching lifecycle logic.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metric key: number of orders placed in the evaluation window.
pub const ORDERS_COUNT: &str = "ordersCount";
/// Metric key: total order value in the evaluation window.
pub const ORDER_VALUE: &str = "orderValue";

/// A bag of usage metrics. Missing keys read as 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageMetrics {
    values: HashMap<String, f64>,
}

impl UsageMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<f64>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<f64>) {
        self.values.insert(key.into(), value.into());
    }

    /// Read a metric, defaulting to 0 when absent.
    #[must_use]
    pub fn get(&self, key: &str) -> f64 {
        self.values.get(key).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Maps usage metrics to a tier id. Stateless strategy.
pub trait TierEvaluator: Send + Sync {
    fn evaluate(&self, metrics: &UsageMetrics) -> String;
}

/// Default threshold policy, evaluated highest tier first; either condition
/// of a row suffices.
///
/// | condition | tier |
/// |---|---|
/// | ordersCount >= 10 or orderValue >= 50000 | PLATINUM |
/// | ordersCount >= 5 or orderValue >= 10000 | GOLD |
/// | otherwise | SILVER |
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdTierEvaluator;

impl TierEvaluator for ThresholdTierEvaluator {
    fn evaluate(&self, metrics: &UsageMetrics) -> String {
        let orders = metrics.get(ORDERS_COUNT);
        let value = metrics.get(ORDER_VALUE);
        if orders >= 10.0 || value >= 50_000.0 {
            "PLATINUM".to_string()
        } else if orders >= 5.0 || value >= 10_000.0 {
            "GOLD".to_string()
        } else {
            "SILVER".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluate(orders: u32, value: u32) -> String {
        ThresholdTierEvaluator.evaluate(
            &UsageMetrics::new()
                .with(ORDERS_COUNT, orders)
                .with(ORDER_VALUE, value),
        )
    }

    #[test]
    fn platinum_on_either_condition() {
        assert_eq!(evaluate(12, 60_000), "PLATINUM");
        assert_eq!(evaluate(10, 0), "PLATINUM");
        assert_eq!(evaluate(0, 50_000), "PLATINUM");
    }

    #[test]
    fn gold_on_either_condition() {
        assert_eq!(evaluate(5, 0), "GOLD");
        assert_eq!(evaluate(0, 10_000), "GOLD");
        assert_eq!(evaluate(9, 9_999), "GOLD");
    }

    #[test]
    fn silver_otherwise() {
        assert_eq!(evaluate(1, 100), "SILVER");
        assert_eq!(evaluate(4, 9_999), "SILVER");
    }

    #[test]
    fn missing_metrics_default_to_zero() {
        assert_eq!(
            ThresholdTierEvaluator.evaluate(&UsageMetrics::new()),
            "SILVER"
        );
        assert_eq!(
            ThresholdTierEvaluator.evaluate(&UsageMetrics::new().with(ORDERS_COUNT, 11)),
            "PLATINUM"
        );
    }
}
