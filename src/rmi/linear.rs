/// Linear model `y = slope * x + intercept` predicting a position in `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LinearModel {
    slope: f64,
    intercept: f64,
}

impl LinearModel {
    pub fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }

    /// Spline through `(min_x, min_y)` and `(max_x, max_y)`.
    ///
    /// Equal x coordinates give a flat model at `min_y`.
    pub fn through(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        let slope = if min_x == max_x {
            0.0
        } else {
            (max_y - min_y) / (max_x - min_x)
        };
        Self {
            slope,
            intercept: min_y - slope * min_x,
        }
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Prediction for `x`, clamped to `[0, 1]`.
    #[inline]
    pub fn normalized(&self, x: f64) -> f64 {
        (self.slope * x + self.intercept).clamp(0.0, 1.0)
    }

    /// The x predicted at normalized position `y`, rounded half up.
    pub fn normalized_inverse(&self, y: f64) -> f64 {
        0.5 + (y - self.intercept) / self.slope
    }

    /// Prediction for `x` scaled onto `[0, max_value]`, rounded half up.
    #[inline]
    pub fn predict(&self, x: f64, max_value: usize) -> usize {
        // NaN slopes clamp to NaN, which the float cast saturates to 0.
        (max_value as f64 * self.normalized(x) + 0.5) as usize
    }
}
