//! Keyed store of per-symbol indicator series.

use std::collections::HashMap;

/// Named indicator series for one symbol, all aligned to the same bar index.
///
/// Lookups return `None` for unknown keys or out-of-range indexes; NaN values
/// are returned as-is and it is the caller's job to treat them as "not ready".
#[derive(Debug, Clone, Default)]
pub struct IndicatorSeries {
    series: HashMap<String, Vec<f64>>,
}

impl IndicatorSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    /// Value of series `name` at bar `index`.
    pub fn get(&self, name: &str, index: usize) -> Option<f64> {
        self.series.get(name).and_then(|s| s.get(index)).copied()
    }

    /// Like [`get`](Self::get), but also maps NaN to `None`.
    pub fn get_ready(&self, name: &str, index: usize) -> Option<f64> {
        self.get(name, index).filter(|v| !v.is_nan())
    }

    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(|s| s.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.series.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup() {
        let mut s = IndicatorSeries::new();
        s.insert("sma_20", vec![f64::NAN, 10.0, 11.0]);
        assert!(s.contains("sma_20"));
        assert_eq!(s.get("sma_20", 1), Some(10.0));
        assert_eq!(s.get("sma_20", 5), None);
        assert_eq!(s.get("sma_50", 0), None);
    }

    #[test]
    fn get_ready_filters_nan() {
        let mut s = IndicatorSeries::new();
        s.insert("sma_20", vec![f64::NAN, 10.0]);
        assert_eq!(s.get_ready("sma_20", 0), None);
        assert_eq!(s.get_ready("sma_20", 1), Some(10.0));
    }

    #[test]
    fn whole_series_access() {
        let mut s = IndicatorSeries::new();
        s.insert("momentum_20", vec![1.0, 2.0]);
        assert_eq!(s.get_series("momentum_20").unwrap().len(), 2);
    }
}
