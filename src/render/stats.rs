//! Numerical statistics for the details pane.

use crate::data::{unravel, NdArray, Value};

/// Summary statistics of a numeric array. Non-finite elements are skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    /// Finite elements counted.
    pub count: usize,
    /// Minimum.
    pub min: f64,
    /// Maximum.
    pub max: f64,
    /// Mean.
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    /// Population variance.
    pub variance: f64,
    /// 25th percentile.
    pub p25: f64,
    /// Median.
    pub median: f64,
    /// 75th percentile.
    pub p75: f64,
}

impl Statistics {
    /// Compute over the array view. Returns `None` for non-numeric arrays,
    /// arrays with no finite elements, or more than `max_elements` elements.
    pub fn compute(arr: &NdArray, max_elements: usize) -> Option<Self> {
        if !arr.is_numeric() || arr.len() > max_elements {
            return None;
        }

        let shape = arr.shape();
        let mut values: Vec<f64> = (0..arr.len())
            .filter_map(|flat| match arr.get(&unravel(flat, shape))? {
                Value::Int(v) => Some(v as f64),
                Value::Float(v) => Some(v),
                _ => None,
            })
            .filter(|v| v.is_finite())
            .collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.total_cmp(b));

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

        Some(Self {
            count,
            min: values[0],
            max: values[count - 1],
            mean,
            std: variance.sqrt(),
            variance,
            p25: percentile(&values, 0.25),
            median: percentile(&values, 0.5),
            p75: percentile(&values, 0.75),
        })
    }
}

/// Linear interpolation between closest ranks of sorted, non-empty `values`.
fn percentile(values: &[f64], q: f64) -> f64 {
    let pos = q * (values.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    values[lo] + (values[hi] - values[lo]) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quartiles_interpolate() {
        let arr = NdArray::from_f64(&[2, 2], vec![4.0, 1.0, 3.0, 2.0]).unwrap();
        let stats = Statistics::compute(&arr, 100).unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!((stats.min, stats.max), (1.0, 4.0));
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.variance, 1.25);
        assert_eq!(stats.p25, 1.75);
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.p75, 3.25);
    }

    #[test]
    fn works_on_sub_views_and_skips_nan() {
        let arr = NdArray::from_f64(&[2, 3], vec![0.0, 0.0, 0.0, 5.0, f64::NAN, 7.0]).unwrap();
        let row = arr.index(&[1]).unwrap();
        let stats = Statistics::compute(row.as_array().unwrap(), 100).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean, 6.0);
    }

    #[test]
    fn bounded_and_numeric_only() {
        let arr = NdArray::from_i64(&[10], (0..10).collect()).unwrap();
        assert!(Statistics::compute(&arr, 5).is_none());
        let text = NdArray::from_data(crate::data::ArrayData::Text(
            ndarray::ArrayD::from_elem(ndarray::IxDyn(&[2]), "a".to_string()),
        ));
        assert!(Statistics::compute(&text, 100).is_none());
    }
}
