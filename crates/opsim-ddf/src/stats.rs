//! Scalar reductions used by the reference SQLite engine.

/// Percentile with linear interpolation between closest ranks.
///
/// `pct` is in [0, 100]. Returns `None` on an empty slice.
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let weight = rank - lo as f64;
    Some(sorted[lo] * (1.0 - weight) + sorted[hi] * weight)
}

pub fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 50.0)
}

pub fn max(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .fold(None, |acc, v| match acc {
            Some(m) if m >= v => Some(m),
            _ => Some(v),
        })
}

/// Coadded five-sigma depth: individual visit depths combine in flux space,
/// `1.25 * log10(sum(10^(0.8 * m5)))`.
pub fn coadd_m5(depths: &[f64]) -> Option<f64> {
    if depths.is_empty() {
        return None;
    }
    let flux_sum: f64 = depths.iter().map(|m5| 10f64.powf(0.8 * m5)).sum();
    Some(1.25 * flux_sum.log10())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&values, 0.0), Some(1.0));
        assert_eq!(percentile(&values, 100.0), Some(4.0));
        assert_eq!(percentile(&values, 50.0), Some(2.5));
        assert_eq!(percentile(&values, 25.0), Some(1.75));
    }

    #[test]
    fn test_percentile_unsorted_input() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(percentile(&values, 50.0), Some(2.5));
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(percentile(&[], 50.0), None);
        assert_eq!(median(&[]), None);
        assert_eq!(max(&[]), None);
        assert_eq!(coadd_m5(&[]), None);
    }

    #[test]
    fn test_median_odd_count() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
    }

    #[test]
    fn test_max() {
        assert_eq!(max(&[1.2, 1.9, 1.4]), Some(1.9));
    }

    #[test]
    fn test_coadd_single_visit_is_identity() {
        let depth = coadd_m5(&[24.0]).expect("coadd");
        assert!((depth - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_coadd_two_equal_visits_gains_depth() {
        // Two identical visits deepen the coadd by 1.25 * log10(2).
        let depth = coadd_m5(&[24.0, 24.0]).expect("coadd");
        let expected = 24.0 + 1.25 * 2f64.log10();
        assert!((depth - expected).abs() < 1e-9);
    }
}
