//! Simple moving average over a fixed window.

/// Rolling SMA of `values` over `period`.
///
/// The first `period - 1` entries are NaN (warmup). Any window containing a
/// NaN (a void bar) yields NaN, and the rolling sum is rebuilt once the
/// window is clean again, so a single gap never poisons the rest of the
/// series. `period == 0` returns an all-NaN series.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let mut sum = 0.0;
    let mut nan_in_window = 0usize;

    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            nan_in_window += 1;
        } else {
            sum += v;
        }

        if i >= period {
            let leaving = values[i - period];
            if leaving.is_nan() {
                nan_in_window -= 1;
            } else {
                sum -= leaving;
            }
        }

        if i + 1 >= period && nan_in_window == 0 {
            out[i] = sum / period as f64;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_approx;

    #[test]
    fn warmup_prefix_is_nan() {
        let out = sma(&[10.0, 11.0, 12.0, 13.0, 14.0], 3);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert_approx(out[2], 11.0);
        assert_approx(out[3], 12.0);
        assert_approx(out[4], 13.0);
    }

    #[test]
    fn constant_series_yields_constant_sma() {
        let out = sma(&[5.0; 10], 4);
        for v in &out[3..] {
            assert_approx(*v, 5.0);
        }
    }

    #[test]
    fn nan_window_propagates_then_recovers() {
        let values = [10.0, 10.0, 10.0, f64::NAN, 10.0, 10.0, 10.0, 10.0];
        let out = sma(&values, 3);
        assert_approx(out[2], 10.0);
        // Windows touching index 3 are NaN.
        assert!(out[3].is_nan());
        assert!(out[4].is_nan());
        assert!(out[5].is_nan());
        // Window [5,6,7] is clean again.
        assert_approx(out[6], 10.0);
        assert_approx(out[7], 10.0);
    }

    #[test]
    fn series_shorter_than_period_is_all_nan() {
        let out = sma(&[1.0, 2.0], 5);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn zero_period_is_all_nan() {
        let out = sma(&[1.0, 2.0, 3.0], 0);
        assert!(out.iter().all(|v| v.is_nan()));
    }
}
