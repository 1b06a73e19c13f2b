//! Aggregate win rate of an experiment.

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, IngestResult};
use crate::game::NonlocalGame;
use crate::stats;

/// Mean success probability over all circuits of a run, with its 95%
/// confidence half-width and the one-sided p-value against the classical
/// bound of the game.
///
/// Derived once from per-circuit win rates and never recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Winrate {
    /// Mean win rate across circuits.
    pub value: f64,
    /// 95% confidence half-width.
    pub ci95: f64,
    /// Probability of reaching `value` with a classical strategy.
    pub p_value: f64,
    /// Plug-in variance `mean(w·(1−w))`.
    pub var: f64,
}

impl Winrate {
    /// Derive the summary from per-circuit win rates measured with `shots`
    /// shots each.
    pub fn from_circuit_winrates(
        game: &NonlocalGame,
        winrates: &[f64],
        shots: u64,
    ) -> IngestResult<Self> {
        if winrates.is_empty() {
            return Err(IngestError::Validation(
                "cannot derive a win rate from zero circuits".into(),
            ));
        }
        if shots == 0 {
            return Err(IngestError::Validation(
                "cannot derive a win rate from zero shots".into(),
            ));
        }

        Ok(Self {
            value: stats::mean(winrates),
            ci95: stats::confidence_interval(winrates, shots, stats::DEFAULT_RISK),
            p_value: stats::p_value(winrates, shots, game.optimal_classical_value),
            var: stats::plugin_variance(winrates),
        })
    }

    /// Render as a percentage with the error on the last digits, e.g.
    /// `98.67(14)`.
    ///
    /// The value is truncated and the error rounded up.
    pub fn to_str(&self, decimals: u32) -> String {
        let scale = 10f64.powi(decimals as i32);

        let percent = self.value * 100.0;
        let truncated = (percent * scale).floor() / scale;
        let err = (self.ci95 * (100.0 * scale)).ceil() as i64;

        format!("{truncated:.prec$}({err})", prec = decimals as usize)
    }
}

impl std::fmt::Display for Winrate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_str(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g14() -> NonlocalGame {
        NonlocalGame::new("G14", 86.0 / 88.0, 1.0)
    }

    fn winrate(value: f64, ci95: f64) -> Winrate {
        Winrate {
            value,
            ci95,
            p_value: 1.0,
            var: 0.0,
        }
    }

    #[test]
    fn test_to_str_truncates_value_and_rounds_error_up() {
        assert_eq!(winrate(0.9867, 0.0014).to_str(1), "98.6(2)");
        assert_eq!(winrate(0.9867, 0.0014).to_str(2), "98.67(14)");
        assert_eq!(winrate(0.875, 0.0123).to_str(1), "87.5(13)");
    }

    #[test]
    fn test_display_uses_one_decimal() {
        assert_eq!(winrate(0.9867, 0.0014).to_string(), "98.6(2)");
    }

    #[test]
    fn test_from_circuit_winrates() {
        let wr = Winrate::from_circuit_winrates(&g14(), &[0.95, 0.80], 2000).unwrap();
        assert!((wr.value - 0.875).abs() < 1e-12);
        assert!((wr.var - 0.10375).abs() < 1e-12);
        assert_eq!(wr.p_value, 1.0);
        assert!((wr.ci95 - 0.015_062_942_127_823_633).abs() < 1e-12);
    }

    #[test]
    fn test_from_circuit_winrates_rejects_empty_input() {
        assert!(Winrate::from_circuit_winrates(&g14(), &[], 2000).is_err());
        assert!(Winrate::from_circuit_winrates(&g14(), &[0.9], 0).is_err());
    }
}
