//! Concentration-bound statistics for per-circuit win rates.
//!
//! A run of a nonlocal game consists of `m` circuits, each measured `n`
//! times. Given the empirical win rate of every circuit, this module derives
//! a 95% confidence half-width and a one-sided p-value against the best
//! classical strategy using a Bernstein-style bound:
//!
//! ```text
//! σ²  = mean(w·(1−w))
//! ci  = 2·ln(2/d)/(3n) + σ·sqrt(2·ln(2/d)/(m·n))
//! ε   = mean(w) − ω_c
//! p   = exp(−½·n·ε² / (σ²/m + ε/3))        (p = 1 when ε < 0)
//! ```
//!
//! Both functions are closed-form; no resampling is involved.

/// Default risk level for the confidence interval (95% coverage).
pub const DEFAULT_RISK: f64 = 0.05;

/// Arithmetic mean. Returns `NaN` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Plug-in variance estimate `mean(w·(1−w))` over all circuits.
pub fn plugin_variance(winrates: &[f64]) -> f64 {
    winrates.iter().map(|w| w * (1.0 - w)).sum::<f64>() / winrates.len() as f64
}

/// Confidence half-width of the mean win rate at risk level `risk`.
///
/// Both terms shrink as the total measurement volume `m·n` grows, so the
/// bound is non-increasing in `shots` and in the number of circuits.
pub fn confidence_interval(winrates: &[f64], shots: u64, risk: f64) -> f64 {
    let m = winrates.len() as f64;
    let n = shots as f64;

    let sigma = plugin_variance(winrates).sqrt();
    let log_term = 2.0 * (2.0 / risk).ln();
    let term1 = log_term / (3.0 * n);
    let term2 = log_term / (m * n);

    term1 + sigma * term2.sqrt()
}

/// One-sided p-value that a strategy bounded by `classical_bound` reaches
/// the observed mean win rate by chance.
///
/// Returns exactly `1.0` when the observed mean does not exceed the bound.
pub fn p_value(winrates: &[f64], shots: u64, classical_bound: f64) -> f64 {
    let m = winrates.len() as f64;
    let n = shots as f64;
    let sigma2 = plugin_variance(winrates);

    let eps = mean(winrates) - classical_bound;

    // ε = 0 also maps to 1; the bound is 0/0 there when σ² = 0.
    if eps <= 0.0 {
        return 1.0;
    }

    (-0.5 * n * eps.powi(2) / (sigma2 / m + eps / 3.0)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const G14_CLASSICAL: f64 = 86.0 / 88.0;

    #[test]
    fn test_confidence_interval_reference_value() {
        let ci = confidence_interval(&[0.95, 0.80], 2000, DEFAULT_RISK);
        assert!((ci - 0.015_062_942_127_823_633).abs() < 1e-12);
    }

    #[test]
    fn test_single_circuit_is_finite() {
        let ci = confidence_interval(&[0.9], 100, DEFAULT_RISK);
        assert!(ci.is_finite());
        assert!(ci > 0.0);
    }

    #[test]
    fn test_p_value_below_bound_is_one() {
        assert_eq!(p_value(&[0.95, 0.80], 2000, G14_CLASSICAL), 1.0);
    }

    #[test]
    fn test_p_value_reference_value() {
        let p = p_value(&[0.99, 0.98, 0.97], 1000, G14_CLASSICAL);
        assert!((p - 0.605_803_013_546_607_9).abs() < 1e-9);
    }

    #[test]
    fn test_p_value_at_bound_with_zero_variance() {
        assert_eq!(p_value(&[1.0, 1.0], 100, 1.0), 1.0);
    }

    #[test]
    fn test_plugin_variance() {
        let var = plugin_variance(&[0.95, 0.80]);
        assert!((var - 0.10375).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_p_value_in_unit_interval_above_bound(
            winrates in prop::collection::vec(0.98f64..=1.0, 1..40),
            shots in 1u64..10_000,
        ) {
            let p = p_value(&winrates, shots, 0.98);
            prop_assert!(p > 0.0);
            prop_assert!(p <= 1.0);
        }

        #[test]
        fn prop_p_value_exactly_one_below_bound(
            winrates in prop::collection::vec(0.0f64..0.97, 1..40),
            shots in 1u64..100_000,
        ) {
            prop_assert_eq!(p_value(&winrates, shots, 0.98), 1.0);
        }

        #[test]
        fn prop_ci_non_increasing_in_shots(
            winrates in prop::collection::vec(0.0f64..=1.0, 1..40),
            shots in 1u64..50_000,
            extra in 0u64..50_000,
        ) {
            let fewer = confidence_interval(&winrates, shots, DEFAULT_RISK);
            let more = confidence_interval(&winrates, shots + extra, DEFAULT_RISK);
            prop_assert!(more <= fewer);
        }

        #[test]
        fn prop_ci_non_increasing_in_circuits(
            w in 0.0f64..=1.0,
            m in 1usize..64,
            extra in 0usize..64,
            shots in 1u64..50_000,
        ) {
            // Repeating one win rate holds σ fixed while m grows.
            let fewer = confidence_interval(&vec![w; m], shots, DEFAULT_RISK);
            let more = confidence_interval(&vec![w; m + extra], shots, DEFAULT_RISK);
            prop_assert!(more <= fewer + 1e-12);
        }
    }
}
