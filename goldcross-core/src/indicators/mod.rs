//! Precomputed indicator series.
//!
//! Indicators are pure functions: numeric series in, same-length series out,
//! with `f64::NAN` for the warmup prefix and any window containing a void
//! bar. They are computed once before the bar loop; no indicator value at
//! index t may depend on data from index t+1 or later.

pub mod momentum;
pub mod series;
pub mod sma;

pub use momentum::momentum;
pub use series::IndicatorSeries;
pub use sma::sma;

/// Volume confirmation window used by the signal evaluator.
pub const VOLUME_MA_PERIOD: usize = 20;

/// Lookback for the benchmark momentum term in regime classification.
pub const MOMENTUM_LOOKBACK: usize = 20;

/// Key for an SMA series of the given period.
pub fn sma_key(period: usize) -> String {
    format!("sma_{period}")
}

/// Key for a volume-SMA series of the given period.
pub fn volume_ma_key(period: usize) -> String {
    format!("volume_ma_{period}")
}

/// Key for a momentum series of the given lookback.
pub fn momentum_key(lookback: usize) -> String {
    format!("momentum_{lookback}")
}

#[cfg(test)]
pub(crate) fn assert_approx(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
