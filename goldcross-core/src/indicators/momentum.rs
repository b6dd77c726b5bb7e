//! Percentage momentum over a fixed lookback.

/// Percent change from `lookback` bars ago: `(v[t] / v[t-lookback] - 1) * 100`.
///
/// NaN for the first `lookback` entries, for either endpoint being NaN, and
/// for a zero base value.
pub fn momentum(values: &[f64], lookback: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if lookback == 0 {
        return out;
    }
    for i in lookback..values.len() {
        let base = values[i - lookback];
        let cur = values[i];
        if base.is_nan() || cur.is_nan() || base == 0.0 {
            continue;
        }
        out[i] = (cur / base - 1.0) * 100.0;
    }
    out
}
