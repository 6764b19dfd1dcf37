//! Activation Functions
//!
//! This module provides the element-wise nonlinearities used by the
//! recurrence and their derivatives for backpropagation.
//!
//! ## Derivatives From the Output
//!
//! The backward pass only keeps the *activated* hidden states, so every
//! derivative here is expressed in terms of the output `out = f(x)`:
//!
//! ```text
//! logistic: f'(x) = out × (1 - out)
//! tanh:     f'(x) = 1 - out²
//! relu:     f'(x) = 1 if out > 0 else 0
//! ```
//!
//! ## Initialization Coefficient
//!
//! The logistic function saturates slowly around zero (its slope there is
//! 1/4), so Xavier-style initialization scales its weights up by 4.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Kind of element-wise nonlinearity
///
/// Command-line and snapshot names are both lowercase (`logistic`, `tanh`,
/// `relu`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Logistic,
    Tanh,
    Relu,
}

impl Activation {
    /// Apply the activation element-wise
    ///
    /// # Example
    ///
    /// ```rust
    /// # use rnn_classifier::Activation;
    /// let out = Activation::Logistic.evaluate(&[0.0]);
    /// assert_eq!(out, vec![0.5]);
    /// ```
    pub fn evaluate(self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|&v| self.apply(v)).collect()
    }

    /// Element-wise derivative, given the already-activated vector
    pub fn derivative(self, out: &[f64]) -> Vec<f64> {
        out.iter().map(|&o| self.slope(o)).collect()
    }

    /// Scale factor for uniform weight initialization
    pub fn init_coefficient(self) -> f64 {
        match self {
            Activation::Logistic => 4.0,
            Activation::Tanh | Activation::Relu => 1.0,
        }
    }

    fn apply(self, v: f64) -> f64 {
        match self {
            Activation::Logistic => {
                // Split on sign so exp never overflows
                if v >= 0.0 {
                    1.0 / (1.0 + (-v).exp())
                } else {
                    let e = v.exp();
                    e / (1.0 + e)
                }
            }
            Activation::Tanh => v.tanh(),
            Activation::Relu => v.max(0.0),
        }
    }

    fn slope(self, out: f64) -> f64 {
        match self {
            Activation::Logistic => out * (1.0 - out),
            Activation::Tanh => 1.0 - out * out,
            Activation::Relu => {
                if out > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Compare the output-form derivative with a central difference of `evaluate`.
    fn check_derivative(act: Activation, points: &[f64]) {
        let eps = 1e-6;
        let out = act.evaluate(points);
        let analytic = act.derivative(&out);
        for (i, &x) in points.iter().enumerate() {
            let plus = act.evaluate(&[x + eps])[0];
            let minus = act.evaluate(&[x - eps])[0];
            let numeric = (plus - minus) / (2.0 * eps);
            assert!(
                (numeric - analytic[i]).abs() < 1e-6,
                "{:?} at {}: numeric {} vs analytic {}",
                act,
                x,
                numeric,
                analytic[i]
            );
        }
    }

    #[test]
    fn test_logistic_values() {
        let out = Activation::Logistic.evaluate(&[0.0, 800.0, -800.0]);
        assert_eq!(out[0], 0.5);
        assert!((out[1] - 1.0).abs() < 1e-12);
        assert!(out[2] >= 0.0 && out[2] < 1e-12);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_logistic_derivative_from_output() {
        assert_eq!(Activation::Logistic.derivative(&[0.5]), vec![0.25]);
        check_derivative(Activation::Logistic, &[-3.0, -0.2, 0.0, 0.7, 2.5]);
    }

    #[test]
    fn test_tanh_derivative_from_output() {
        check_derivative(Activation::Tanh, &[-2.0, -0.1, 0.3, 1.9]);
    }

    #[test]
    fn test_relu_derivative_from_output() {
        let out = Activation::Relu.evaluate(&[-1.0, 2.0]);
        assert_eq!(out, vec![0.0, 2.0]);
        assert_eq!(Activation::Relu.derivative(&out), vec![0.0, 1.0]);
    }

    #[test]
    fn test_init_coefficient() {
        assert_eq!(Activation::Logistic.init_coefficient(), 4.0);
        assert_eq!(Activation::Tanh.init_coefficient(), 1.0);
        assert_eq!(Activation::Relu.init_coefficient(), 1.0);
    }

    #[test]
    fn test_cli_names_match_serde_names() {
        for act in Activation::value_variants() {
            let cli = act.to_possible_value().unwrap();
            let stored = serde_json::to_string(act).unwrap();
            assert_eq!(format!("\"{}\"", cli.get_name()), stored);
            assert_eq!(Activation::from_str(cli.get_name(), false).unwrap(), *act);
        }
    }
}
