//! Meta-parameters of the adaptive engine.
//!
//! `Parameters` is an immutable value: every change produces a new instance.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from constructing a parameter set.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("parameter {field} is not finite: {value}")]
    NotFinite { field: ParameterField, value: f64 },
    #[error("parameter {field} must be non-negative, got {value}")]
    Negative { field: ParameterField, value: f64 },
}

/// One of the five scalar meta-parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterField {
    /// Transaction cost per unit change of position.
    Delta,
    /// Learning rate of the return moments.
    Eta,
    /// Gradient step size.
    Rho,
    /// Stop-loss threshold.
    X,
    /// Signal deadband threshold.
    Y,
}

impl ParameterField {
    pub const ALL: [ParameterField; 5] = [
        ParameterField::Delta,
        ParameterField::Eta,
        ParameterField::Rho,
        ParameterField::X,
        ParameterField::Y,
    ];

    /// The two risk-overlay thresholds.
    pub const REDUCED: [ParameterField; 2] = [ParameterField::X, ParameterField::Y];

    pub fn name(self) -> &'static str {
        match self {
            ParameterField::Delta => "delta",
            ParameterField::Eta => "eta",
            ParameterField::Rho => "rho",
            ParameterField::X => "x",
            ParameterField::Y => "y",
        }
    }
}

impl fmt::Display for ParameterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The five meta-parameters `{delta, eta, rho, x, y}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    delta: f64,
    eta: f64,
    rho: f64,
    x: f64,
    y: f64,
}

impl Parameters {
    /// Build a validated parameter set. Every field must be finite and >= 0.
    pub fn new(delta: f64, eta: f64, rho: f64, x: f64, y: f64) -> Result<Self, ParameterError> {
        let params = Self {
            delta,
            eta,
            rho,
            x,
            y,
        };
        params.validate()?;
        Ok(params)
    }

    /// Each field drawn uniformly from [0, 1).
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            delta: rng.gen(),
            eta: rng.gen(),
            rho: rng.gen(),
            x: rng.gen(),
            y: rng.gen(),
        }
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        for field in ParameterField::ALL {
            let value = self.get(field);
            if !value.is_finite() {
                return Err(ParameterError::NotFinite { field, value });
            }
            if value < 0.0 {
                return Err(ParameterError::Negative { field, value });
            }
        }
        Ok(())
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn eta(&self) -> f64 {
        self.eta
    }

    pub fn rho(&self) -> f64 {
        self.rho
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn get(&self, field: ParameterField) -> f64 {
        match field {
            ParameterField::Delta => self.delta,
            ParameterField::Eta => self.eta,
            ParameterField::Rho => self.rho,
            ParameterField::X => self.x,
            ParameterField::Y => self.y,
        }
    }

    /// A copy with one field replaced.
    pub fn with(&self, field: ParameterField, value: f64) -> Result<Self, ParameterError> {
        let mut next = *self;
        match field {
            ParameterField::Delta => next.delta = value,
            ParameterField::Eta => next.eta = value,
            ParameterField::Rho => next.rho = value,
            ParameterField::X => next.x = value,
            ParameterField::Y => next.y = value,
        }
        next.validate()?;
        Ok(next)
    }

    /// Fields in `{delta, eta, rho, x, y}` order, for export.
    pub fn to_array(&self) -> [f64; 5] {
        [self.delta, self.eta, self.rho, self.x, self.y]
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            delta: 0.0002,
            eta: 0.01,
            rho: 0.1,
            x: 0.01,
            y: 0.1,
        }
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parameters(delta={}, eta={}, rho={}, x={}, y={})",
            self.delta, self.eta, self.rho, self.x, self.y
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn rejects_negative_fields() {
        let err = Parameters::new(0.1, -0.2, 0.1, 0.1, 0.1).unwrap_err();
        assert_eq!(
            err,
            ParameterError::Negative {
                field: ParameterField::Eta,
                value: -0.2
            }
        );
    }

    #[test]
    fn rejects_nan() {
        assert!(matches!(
            Parameters::new(0.1, 0.1, f64::NAN, 0.1, 0.1),
            Err(ParameterError::NotFinite {
                field: ParameterField::Rho,
                ..
            })
        ));
    }

    #[test]
    fn with_returns_new_instance() {
        let base = Parameters::default();
        let next = base.with(ParameterField::Y, 0.5).unwrap();
        assert_eq!(next.y(), 0.5);
        assert_eq!(base.y(), Parameters::default().y());
        assert_eq!(next.delta(), base.delta());
    }

    #[test]
    fn random_fields_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(1);
        let p = Parameters::random(&mut rng);
        for v in p.to_array() {
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn serde_roundtrip() {
        let p = Parameters::new(0.0, 0.05, 0.3, 0.02, 0.001).unwrap();
        let json = serde_json::to_string(&p).unwrap();
        let back: Parameters = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
