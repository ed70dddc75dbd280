/// Brightness assigned to each threshold boundary, brightest first.
pub const BASE_PERCENTAGES: [f64; 5] = [100.0, 80.0, 60.0, 40.0, 20.0];

/// Returned at or below the first boundary.
pub const CEILING_PERCENT: f64 = 100.0;

/// Returned above the last boundary.
pub const FLOOR_PERCENT: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpolateError {
    #[error("threshold limits must be strictly ascending (limit {index} is {value}, previous is {previous})")]
    NonAscending { index: usize, previous: f64, value: f64 },

    #[error("threshold limit {index} is not a finite number")]
    NonFiniteLimit { index: usize },

    #[error("measurement {0} is not a finite number")]
    NonFiniteMeasurement(f64),
}

/// Ascending ambient boundaries paired with the brightness wanted at each one.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    limits: [f64; 5],
    base: [f64; 5],
}

impl ThresholdTable {
    pub fn new(limits: [f64; 5]) -> Result<Self, InterpolateError> {
        Self::with_base(limits, BASE_PERCENTAGES)
    }

    pub fn with_base(limits: [f64; 5], base: [f64; 5]) -> Result<Self, InterpolateError> {
        for (index, limit) in limits.iter().enumerate() {
            if !limit.is_finite() {
                return Err(InterpolateError::NonFiniteLimit { index });
            }
        }

        for index in 1..limits.len() {
            if limits[index] <= limits[index - 1] {
                return Err(InterpolateError::NonAscending {
                    index,
                    previous: limits[index - 1],
                    value: limits[index],
                });
            }
        }

        Ok(Self { limits, base })
    }

    /// Maps a measurement onto the piecewise-linear curve through
    /// `(limits[i], base[i])`.
    pub fn percent_for(&self, measurement: f64) -> Result<f64, InterpolateError> {
        if !measurement.is_finite() {
            return Err(InterpolateError::NonFiniteMeasurement(measurement));
        }

        if measurement <= self.limits[0] {
            return Ok(CEILING_PERCENT);
        }

        for i in 1..self.limits.len() {
            let (x0, x1) = (self.limits[i - 1], self.limits[i]);
            if measurement > x0 && measurement <= x1 {
                let (y0, y1) = (self.base[i - 1], self.base[i]);
                return Ok(y0 + (measurement - x0) * (y1 - y0) / (x1 - x0));
            }
        }

        Ok(FLOOR_PERCENT)
    }
}

pub fn interpolate(measurement: f64, limits: [f64; 5], base: [f64; 5]) -> Result<f64, InterpolateError> {
    ThresholdTable::with_base(limits, base)?.percent_for(measurement)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: [f64; 5] = [100.0, 200.0, 300.0, 400.0, 500.0];

    #[test]
    fn test_interpolate_between_boundaries() {
        let percent = interpolate(250.0, LIMITS, BASE_PERCENTAGES).unwrap();
        assert_eq!(percent, 70.0);

        let percent = interpolate(125.0, LIMITS, BASE_PERCENTAGES).unwrap();
        assert_eq!(percent, 95.0);
    }

    #[test]
    fn test_interpolate_outside_range() {
        assert_eq!(interpolate(50.0, LIMITS, BASE_PERCENTAGES).unwrap(), 100.0);
        assert_eq!(interpolate(100.0, LIMITS, BASE_PERCENTAGES).unwrap(), 100.0);
        assert_eq!(interpolate(600.0, LIMITS, BASE_PERCENTAGES).unwrap(), 20.0);
        assert_eq!(interpolate(-1.0e9, LIMITS, BASE_PERCENTAGES).unwrap(), 100.0);
    }

    #[test]
    fn test_interpolate_is_continuous_at_boundaries() {
        let table = ThresholdTable::new(LIMITS).unwrap();
        for (limit, base) in LIMITS.iter().zip(BASE_PERCENTAGES.iter()) {
            assert_eq!(table.percent_for(*limit).unwrap(), *base);
        }
    }

    #[test]
    fn test_extremes_ignore_slope_sign() {
        // Rising curve between the boundaries, fixed ends regardless.
        let base = [10.0, 30.0, 50.0, 70.0, 90.0];
        let table = ThresholdTable::with_base(LIMITS, base).unwrap();

        assert_eq!(table.percent_for(0.0).unwrap(), CEILING_PERCENT);
        assert_eq!(table.percent_for(501.0).unwrap(), FLOOR_PERCENT);
        assert_eq!(table.percent_for(150.0).unwrap(), 20.0);
    }

    #[test]
    fn test_rejects_non_ascending_limits() {
        let error = ThresholdTable::new([100.0, 200.0, 200.0, 400.0, 500.0]).unwrap_err();
        assert_eq!(
            error,
            InterpolateError::NonAscending { index: 2, previous: 200.0, value: 200.0 }
        );

        assert!(ThresholdTable::new([500.0, 400.0, 300.0, 200.0, 100.0]).is_err());
    }

    #[test]
    fn test_rejects_non_finite_input() {
        assert_eq!(
            ThresholdTable::new([100.0, f64::NAN, 300.0, 400.0, 500.0]).unwrap_err(),
            InterpolateError::NonFiniteLimit { index: 1 }
        );

        let table = ThresholdTable::new(LIMITS).unwrap();
        assert!(table.percent_for(f64::INFINITY).is_err());
    }
}
