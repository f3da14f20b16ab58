//! Two-sample hypothesis tests used for drift detection.

use crate::error::{PipelineError, Result};
use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::f64::consts::PI;

/// Statistic and p-value of a hypothesis test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestOutcome {
    pub statistic: f64,
    pub p_value: f64,
}

/// Two-sided two-sample Kolmogorov-Smirnov test with the asymptotic p-value.
///
/// Inputs must not contain NaN. Both samples need at least one value.
pub fn ks_2samp(reference: &[f64], current: &[f64]) -> Result<TestOutcome> {
    if reference.is_empty() || current.is_empty() {
        return Err(PipelineError::InvalidArgument(
            "KS test needs non-empty samples".into(),
        ));
    }

    let mut a = reference.to_vec();
    let mut b = current.to_vec();
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);

    let statistic = ks_statistic(&a, &b);

    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let en = (n1 * n2 / (n1 + n2)).sqrt();
    // Stephens' small-sample correction of the limiting distribution.
    let lambda = (en + 0.12 + 0.11 / en) * statistic;

    Ok(TestOutcome {
        statistic,
        p_value: kolmogorov_sf(lambda).clamp(0.0, 1.0),
    })
}

/// Largest vertical distance between the two empirical CDFs. Inputs sorted.
fn ks_statistic(a: &[f64], b: &[f64]) -> f64 {
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0usize, 0usize);
    let mut d: f64 = 0.0;

    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x {
            i += 1;
        }
        while j < b.len() && b[j] <= x {
            j += 1;
        }
        d = d.max((i as f64 / n1 - j as f64 / n2).abs());
    }

    d
}

/// Survival function of the Kolmogorov distribution, `P(K > z)`.
fn kolmogorov_sf(z: f64) -> f64 {
    if z <= 0.0 {
        return 1.0;
    }
    if z < 1.18 {
        let y = (-PI * PI / (8.0 * z * z)).exp();
        let cdf = (2.0 * PI).sqrt() / z * (y + y.powi(9) + y.powi(25) + y.powi(49));
        1.0 - cdf
    } else {
        let x = (-2.0 * z * z).exp();
        2.0 * (x - x.powi(4) + x.powi(9))
    }
}

/// Chi-squared test result with the degrees of freedom used
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChiSquaredOutcome {
    pub statistic: f64,
    pub p_value: f64,
    pub dof: usize,
}

/// Chi-squared test of independence on an `r x 2` contingency table.
///
/// With one degree of freedom and `correction` set, Yates' continuity
/// correction is applied. Every expected frequency must be positive.
pub fn chi2_contingency(table: &[[f64; 2]], correction: bool) -> Result<ChiSquaredOutcome> {
    let col_sums = table
        .iter()
        .fold([0.0, 0.0], |acc, row| [acc[0] + row[0], acc[1] + row[1]]);
    let total = col_sums[0] + col_sums[1];
    let dof = table.len().saturating_sub(1);

    if dof == 0 {
        return Ok(ChiSquaredOutcome {
            statistic: 0.0,
            p_value: 1.0,
            dof,
        });
    }

    let mut statistic = 0.0;
    for row in table {
        let row_sum = row[0] + row[1];
        for (j, &observed) in row.iter().enumerate() {
            let expected = row_sum * col_sums[j] / total;
            if !(expected > 0.0) {
                return Err(PipelineError::Statistics(
                    "contingency table has a zero expected frequency".into(),
                ));
            }
            let mut diff = observed - expected;
            if correction && dof == 1 {
                diff = diff.signum() * (diff.abs() - 0.5).max(0.0);
            }
            statistic += diff * diff / expected;
        }
    }

    let distribution =
        ChiSquared::new(dof as f64).map_err(|e| PipelineError::Statistics(e.to_string()))?;

    Ok(ChiSquaredOutcome {
        statistic,
        p_value: distribution.sf(statistic).clamp(0.0, 1.0),
        dof,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ks_identical_samples() {
        let sample: Vec<f64> = (0..50).map(|i| i as f64 * 0.1).collect();
        let outcome = ks_2samp(&sample, &sample).unwrap();

        assert_eq!(outcome.statistic, 0.0);
        assert_eq!(outcome.p_value, 1.0);
    }

    #[test]
    fn test_ks_disjoint_samples() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [6.0, 7.0, 8.0, 9.0, 10.0];
        let outcome = ks_2samp(&a, &b).unwrap();

        assert_eq!(outcome.statistic, 1.0);
        assert!(outcome.p_value < 0.05);
    }

    #[test]
    fn test_ks_statistic_with_ties() {
        let a = [1.0, 2.0, 2.0, 3.0];
        let b = [2.0, 2.0, 3.0, 4.0];
        let outcome = ks_2samp(&a, &b).unwrap();

        // F_a(2) = 0.75, F_b(2) = 0.5; F_a(3) = 1.0, F_b(3) = 0.75
        assert_relative_eq!(outcome.statistic, 0.25);
    }

    #[test]
    fn test_ks_large_shift_is_significant() {
        let reference: Vec<f64> = (0..100).map(|i| (i as f64 / 100.0) * 2.0 - 1.0).collect();
        let current: Vec<f64> = reference.iter().map(|x| x + 5.0).collect();

        let outcome = ks_2samp(&reference, &current).unwrap();
        assert_eq!(outcome.statistic, 1.0);
        assert!(outcome.p_value < 1e-10);
    }

    #[test]
    fn test_ks_rejects_empty() {
        assert!(ks_2samp(&[], &[1.0]).is_err());
    }

    #[test]
    fn test_kolmogorov_sf_reference_points() {
        // Classic 5% critical value of the Kolmogorov distribution.
        assert_relative_eq!(kolmogorov_sf(1.358), 0.05, epsilon = 1e-3);
        assert_relative_eq!(kolmogorov_sf(1.0), 0.27, epsilon = 1e-3);
        assert_eq!(kolmogorov_sf(0.0), 1.0);
    }

    #[test]
    fn test_chi2_2x2_uncorrected_matches_closed_form() {
        // n (ad - bc)^2 / ((a+b)(c+d)(a+c)(b+d)) = 4.5
        let table = [[10.0, 5.0], [10.0, 20.0]];
        let outcome = chi2_contingency(&table, false).unwrap();

        assert_relative_eq!(outcome.statistic, 4.5, epsilon = 1e-9);
        assert_eq!(outcome.dof, 1);
        assert_relative_eq!(outcome.p_value, 0.0339, epsilon = 1e-3);
    }

    #[test]
    fn test_chi2_2x2_yates_correction() {
        let table = [[10.0, 5.0], [10.0, 20.0]];
        let corrected = chi2_contingency(&table, true).unwrap();

        // |ad - bc| reduced by n/2: 45 * (150 - 22.5)^2 / 225000 = 3.25125
        assert_relative_eq!(corrected.statistic, 3.25125, epsilon = 1e-9);
        assert!(corrected.p_value > 0.0339);
    }

    #[test]
    fn test_chi2_three_categories() {
        let table = [[30.0, 10.0], [30.0, 10.0], [40.0, 80.0]];
        let outcome = chi2_contingency(&table, true).unwrap();

        assert_eq!(outcome.dof, 2);
        assert!(outcome.statistic > 0.0);
        assert!(outcome.p_value < 0.001);
    }

    #[test]
    fn test_chi2_identical_distributions() {
        let table = [[25.0, 25.0], [75.0, 75.0]];
        let outcome = chi2_contingency(&table, true).unwrap();

        assert_eq!(outcome.statistic, 0.0);
        assert_relative_eq!(outcome.p_value, 1.0);
    }

    #[test]
    fn test_chi2_zero_expected_is_error() {
        let table = [[0.0, 0.0], [5.0, 5.0]];
        assert!(chi2_contingency(&table, true).is_err());
    }
}
