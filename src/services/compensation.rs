//! Rule-based compensation estimates.
//!
//! Pure arithmetic over a fixed per-crop rate table; no external calls.

use crate::models::{CompensationBreakdown, CompensationResponse};

/// Base compensation rate per acre in USD for each supported crop.
const CROP_BASE_RATES: [(&str, f64); 10] = [
    ("Wheat", 250.0),
    ("Rice", 300.0),
    ("Corn", 350.0),
    ("Soybean", 280.0),
    ("Cotton", 400.0),
    ("Tomato", 500.0),
    ("Potato", 320.0),
    ("Sugarcane", 380.0),
    ("Coffee", 600.0),
    ("Tea", 450.0),
];

/// Rate applied to crops missing from the table.
const DEFAULT_BASE_RATE: f64 = 250.0;

/// Affected area assumed per claim, in acres. In a real deployment this would
/// come from farmer input or satellite data.
const AREA_AFFECTED_ACRES: f64 = 10.0;

/// Look up the per-acre base rate for a crop.
pub fn base_rate(crop_type: &str) -> f64 {
    CROP_BASE_RATES
        .iter()
        .find(|(name, _)| *name == crop_type)
        .map(|(_, rate)| *rate)
        .unwrap_or(DEFAULT_BASE_RATE)
}

/// Compute the compensation estimate with its full breakdown.
pub fn calculate(crop_type: &str, damage_type: &str, severity: f64) -> CompensationResponse {
    let rate = base_rate(crop_type);
    let severity_multiplier = severity / 100.0;
    let total = rate * AREA_AFFECTED_ACRES * severity_multiplier;

    CompensationResponse {
        total_compensation: round2(total),
        breakdown: CompensationBreakdown {
            crop_type: crop_type.to_string(),
            damage_type: damage_type.to_string(),
            severity,
            base_rate: rate,
            severity_multiplier: round2(severity_multiplier),
            area_affected: AREA_AFFECTED_ACRES,
        },
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tomato_at_half_severity_pays_2500() {
        let result = calculate("Tomato", "Hail Damage", 50.0);
        assert_eq!(result.total_compensation, 2500.0);
        assert_eq!(result.breakdown.base_rate, 500.0);
        assert_eq!(result.breakdown.severity_multiplier, 0.5);
        assert_eq!(result.breakdown.area_affected, 10.0);
    }

    #[test]
    fn unknown_crop_uses_default_rate() {
        assert_eq!(base_rate("Durian"), 250.0);
        let result = calculate("Durian", "Rust", 100.0);
        assert_eq!(result.total_compensation, 2500.0);
    }

    #[test]
    fn zero_severity_pays_nothing() {
        let result = calculate("Coffee", "Drought", 0.0);
        assert_eq!(result.total_compensation, 0.0);
        assert_eq!(result.breakdown.severity_multiplier, 0.0);
    }

    #[test]
    fn totals_round_to_two_decimals() {
        // 450 * 10 * 0.333 = 1498.5, multiplier rounds to 0.33
        let result = calculate("Tea", "Aphids", 33.3);
        assert_eq!(result.total_compensation, 1498.5);
        assert_eq!(result.breakdown.severity_multiplier, 0.33);
    }

    #[test]
    fn all_table_crops_resolve() {
        for crop in [
            "Wheat",
            "Rice",
            "Corn",
            "Soybean",
            "Cotton",
            "Tomato",
            "Potato",
            "Sugarcane",
            "Coffee",
            "Tea",
        ] {
            assert_ne!(base_rate(crop), 0.0);
        }
        assert_eq!(base_rate("Rice"), 300.0);
    }
}
