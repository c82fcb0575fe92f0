//! Points formula for sustainability actions.
//!
//! `points = floor(value * rate[action_type])`, where unknown action types
//! fall back to the default rate.

use crate::error::PipelineError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Rate applied to action types that are not in the table.
pub const DEFAULT_RATE: u32 = 1;

/// Built-in per-unit rates.
pub const BUILTIN_RATES: &[(&str, u32)] = &[("recycle", 10), ("bike", 5), ("public_transport", 2)];

/// Per-unit point rates keyed by normalized action type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateTable {
    rates: BTreeMap<String, u32>,
    default_rate: u32,
}

impl Default for RateTable {
    fn default() -> Self {
        Self::new(
            BUILTIN_RATES
                .iter()
                .map(|(name, rate)| ((*name).to_string(), *rate)),
            DEFAULT_RATE,
        )
    }
}

impl RateTable {
    pub fn new(rates: impl IntoIterator<Item = (String, u32)>, default_rate: u32) -> Self {
        Self {
            rates: rates
                .into_iter()
                .map(|(name, rate)| (normalize_action_type(&name), rate))
                .collect(),
            default_rate,
        }
    }

    /// Rate for `action_type`, or the default rate when unknown.
    #[must_use]
    pub fn rate_for(&self, action_type: &str) -> u32 {
        self.rates
            .get(&normalize_action_type(action_type))
            .copied()
            .unwrap_or(self.default_rate)
    }

    #[must_use]
    pub const fn default_rate(&self) -> u32 {
        self.default_rate
    }

    /// Known action types and their rates, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.rates.iter().map(|(name, rate)| (name.as_str(), *rate))
    }

    /// Points earned for logging `value` units of `action_type`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidActionValue`] when `value` is negative,
    /// not finite, or the product does not fit in a `u32`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn points_for(&self, action_type: &str, value: f64) -> Result<u32, PipelineError> {
        let invalid = || PipelineError::InvalidActionValue {
            action_type: action_type.to_string(),
            value,
        };

        if !value.is_finite() || value < 0.0 {
            return Err(invalid());
        }

        let points = (value * f64::from(self.rate_for(action_type))).floor();
        if points > f64::from(u32::MAX) {
            return Err(invalid());
        }

        Ok(points as u32)
    }
}

/// Canonical spelling used for lookups and storage.
#[must_use]
pub fn normalize_action_type(action_type: &str) -> String {
    action_type.trim().to_ascii_lowercase().replace([' ', '-'], "_")
}

#[cfg(test)]
mod tests {
    use super::{RateTable, normalize_action_type};
    use crate::error::PipelineError;

    #[test]
    fn recycle_uses_its_rate() {
        let table = RateTable::default();
        assert_eq!(table.points_for("recycle", 3.0).expect("points"), 30);
    }

    #[test]
    fn unknown_type_uses_default_rate() {
        let table = RateTable::default();
        assert_eq!(table.points_for("unknown", 4.0).expect("points"), 4);
    }

    #[test]
    fn fractional_products_are_floored() {
        let table = RateTable::default();
        assert_eq!(table.points_for("bike", 2.5).expect("points"), 12);
        assert_eq!(table.points_for("public_transport", 0.4).expect("points"), 0);
        assert_eq!(table.points_for("walk", 0.99).expect("points"), 0);
    }

    #[test]
    fn lookups_are_normalized() {
        let table = RateTable::default();
        assert_eq!(table.rate_for(" Public-Transport "), 2);
        assert_eq!(normalize_action_type("Public Transport"), "public_transport");
    }

    #[test]
    fn custom_table_overrides_default_rate() {
        let table = RateTable::new([("compost".to_string(), 7)], 3);
        assert_eq!(table.points_for("compost", 2.0).expect("points"), 14);
        assert_eq!(table.points_for("recycle", 2.0).expect("points"), 6);
        assert_eq!(table.default_rate(), 3);
    }

    #[test]
    fn rejects_negative_and_non_finite_values() {
        let table = RateTable::default();
        for value in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                table.points_for("recycle", value),
                Err(PipelineError::InvalidActionValue { .. })
            ));
        }
    }

    #[test]
    fn rejects_overflowing_products() {
        let table = RateTable::default();
        assert!(table.points_for("recycle", f64::from(u32::MAX)).is_err());
    }
}
