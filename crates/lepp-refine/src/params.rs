//! Refinement parameters.

use serde::{Deserialize, Serialize};

use crate::error::{RefineError, RefineResult};

/// Parameters controlling a refinement run.
///
/// # Example
///
/// ```
/// use lepp_refine::RefineParams;
///
/// let params = RefineParams::with_angle(25.0).with_max_iterations(10);
/// assert!(params.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RefineParams {
    /// Minimum acceptable interior angle, in degrees. Must be in `[0, 180)`.
    pub angle_deg: f64,

    /// Upper bound on improvement iterations.
    ///
    /// The loop stops early once no non-border terminal edge remains.
    pub max_iterations: usize,

    /// Validate topology handles before the first detection pass.
    pub validate_input: bool,
}

impl Default for RefineParams {
    fn default() -> Self {
        Self {
            angle_deg: 30.0,
            max_iterations: 64,
            validate_input: true,
        }
    }
}

impl RefineParams {
    /// Create parameters with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create parameters with a given tolerance angle.
    pub fn with_angle(angle_deg: f64) -> Self {
        Self {
            angle_deg,
            ..Default::default()
        }
    }

    /// Set the iteration cap.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Enable or disable input validation.
    #[must_use]
    pub fn with_validation(mut self, validate_input: bool) -> Self {
        self.validate_input = validate_input;
        self
    }

    /// Check that the parameters are usable.
    pub fn validate(&self) -> RefineResult<()> {
        check_angle(self.angle_deg)?;
        if self.max_iterations == 0 {
            return Err(RefineError::invalid_param(
                "max_iterations",
                self.max_iterations,
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Check a tolerance angle and convert it to radians.
pub fn check_angle(angle_deg: f64) -> RefineResult<f64> {
    if !angle_deg.is_finite() || !(0.0..180.0).contains(&angle_deg) {
        return Err(RefineError::invalid_angle(angle_deg));
    }
    Ok(angle_deg.to_radians())
}
