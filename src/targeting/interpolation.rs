use alloc::vec::Vec;

use crate::{error::ConfigurationError, ilerp, lerp};

/// A piecewise-linear curve through calibration points.
///
/// Points are kept sorted by key. Lookups outside the calibrated domain
/// return the nearest endpoint; the table never extrapolates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InterpolatingTable {
    points: Vec<(f64, f64)>,
}

impl InterpolatingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from `(key, value)` pairs in any order.
    pub fn from_points(points: &[(f64, f64)]) -> Result<Self, ConfigurationError> {
        let mut table = Self::new();
        for &(key, value) in points {
            table.insert(key, value)?;
        }
        Ok(table)
    }

    /// Adds a point, replacing any existing point with the same key.
    pub fn insert(&mut self, key: f64, value: f64) -> Result<(), ConfigurationError> {
        if !key.is_finite() || !value.is_finite() {
            return Err(ConfigurationError::NonFiniteCalibrationPoint {
                distance: key,
                value,
            });
        }
        match self.points.binary_search_by(|(k, _)| k.total_cmp(&key)) {
            Ok(i) => self.points[i].1 = value,
            Err(i) => self.points.insert(i, (key, value)),
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Value at `key`, or `None` for an empty table or a NaN key.
    pub fn get(&self, key: f64) -> Option<f64> {
        let (first, last) = (self.points.first()?, self.points.last()?);
        if key.is_nan() {
            return None;
        }
        if key <= first.0 {
            return Some(first.1);
        }
        if key >= last.0 {
            return Some(last.1);
        }

        // first.0 < key < last.0, so 1 <= upper < len.
        let upper = self.points.partition_point(|(k, _)| *k <= key);
        let (k0, v0) = self.points[upper - 1];
        let (k1, v1) = self.points[upper];
        if key == k0 {
            return Some(v0);
        }
        Some(lerp!(v0, v1, ilerp!(k0, k1, key)))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn table() -> InterpolatingTable {
        InterpolatingTable::from_points(&[(3.0, 1500.0), (1.0, 1000.0)]).unwrap()
    }

    #[test]
    fn interpolates_between_brackets() {
        assert_abs_diff_eq!(table().get(2.0).unwrap(), 1250.0, epsilon = 1e-9);
        assert_abs_diff_eq!(table().get(1.5).unwrap(), 1125.0, epsilon = 1e-9);
    }

    #[test]
    fn exact_keys_return_calibrated_values() {
        let table = InterpolatingTable::from_points(&[(1.0, 1000.0), (2.0, 1100.0), (3.0, 1500.0)])
            .unwrap();
        assert_eq!(table.get(1.0), Some(1000.0));
        assert_eq!(table.get(2.0), Some(1100.0));
        assert_eq!(table.get(3.0), Some(1500.0));
    }

    #[test]
    fn clamps_outside_domain() {
        assert_eq!(table().get(0.1), Some(1000.0));
        assert_eq!(table().get(-4.0), Some(1000.0));
        assert_eq!(table().get(40.0), Some(1500.0));
        assert_eq!(table().get(f64::INFINITY), Some(1500.0));
    }

    #[test]
    fn single_point_is_flat() {
        let table = InterpolatingTable::from_points(&[(1.524, 990.0)]).unwrap();
        for key in [0.0, 1.524, 7.0] {
            assert_eq!(table.get(key), Some(990.0));
        }
    }

    #[test]
    fn duplicate_key_replaces_value() {
        let mut table = table();
        table.insert(1.0, 900.0).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1.0), Some(900.0));
    }

    #[test]
    fn rejects_non_finite_points() {
        let mut table = table();
        assert!(table.insert(f64::NAN, 1.0).is_err());
        assert!(table.insert(2.0, f64::INFINITY).is_err());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn empty_and_nan_lookups() {
        assert_eq!(InterpolatingTable::new().get(1.0), None);
        assert_eq!(table().get(f64::NAN), None);
    }
}
