// select/ols.rs

//! Ordinary least squares on an explicit design matrix.
//!
//! This is the end-of-session collaborator: once a selection engine has
//! settled on a predictor subset, [`fit`] produces the authoritative
//! coefficients and covariance for that subset. It deliberately stays at the
//! "coefficients + covariance" contract and is not a general regression
//! framework — no weights, no robust errors, no formula layer.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use ndarray_linalg::{Inverse, Solve};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OlsError {
    #[error("response has {endog_rows} rows but the design matrix has {exog_rows}; the two must agree")]
    DimensionMismatch { endog_rows: usize, exog_rows: usize },
    #[error("the design matrix has no columns; select at least one regressor before fitting")]
    EmptyDesign,
    #[error("normal-equations solve failed, the design may be singular: {0}")]
    Linalg(#[from] ndarray_linalg::error::LinalgError),
}

/// Fitted least-squares model for one response and a fixed design.
#[derive(Debug, Clone)]
pub struct OlsFit {
    /// Coefficient per design column, in column order.
    pub params: Array1<f64>,
    /// `(XᵗX)⁻¹`, the covariance of `params` up to the error variance.
    pub normalized_cov_params: Array2<f64>,
    /// `scale · (XᵗX)⁻¹`.
    pub cov_params: Array2<f64>,
    /// Standard error per coefficient.
    pub bse: Array1<f64>,
    /// Residual sum of squares.
    pub ssr: f64,
    /// Error-variance estimate `ssr / df_resid`.
    pub scale: f64,
    pub nobs: usize,
    pub df_resid: i64,
}

/// Fit `endog` on the columns of `exog` by solving the normal equations.
///
/// `df_resid` is `nobs - ncols` with no further adjustment; when it is not
/// positive, `scale`, `cov_params` and `bse` are non-finite per IEEE rules.
pub fn fit(endog: ArrayView1<f64>, exog: ArrayView2<f64>) -> Result<OlsFit, OlsError> {
    if endog.len() != exog.nrows() {
        return Err(OlsError::DimensionMismatch {
            endog_rows: endog.len(),
            exog_rows: exog.nrows(),
        });
    }
    if exog.ncols() == 0 {
        return Err(OlsError::EmptyDesign);
    }

    let nobs = endog.len();
    let k = exog.ncols();
    let xtx = exog.t().dot(&exog);
    let xty = exog.t().dot(&endog);
    let params = xtx.solve(&xty)?;

    let resid = &endog.to_owned() - &exog.dot(&params);
    let ssr = resid.dot(&resid);
    let df_resid = nobs as i64 - k as i64;
    let scale = ssr / df_resid as f64;

    let normalized_cov_params = xtx.inv()?;
    let cov_params = &normalized_cov_params * scale;
    let bse = Array1::from_shape_fn(k, |j| cov_params[[j, j]].sqrt());

    Ok(OlsFit {
        params,
        normalized_cov_params,
        cov_params,
        bse,
        ssr,
        scale,
        nobs,
        df_resid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    #[test]
    fn recovers_exact_coefficients_on_noiseless_data() {
        // y = 2·x0 - 1·x1 exactly, so the fit must reproduce it with zero ssr.
        let exog = array![
            [1.0, 0.0],
            [0.0, 1.0],
            [1.0, 1.0],
            [2.0, 1.0],
            [1.0, 3.0],
        ];
        let endog = array![2.0, -1.0, 1.0, 3.0, -1.0];

        let fit = fit(endog.view(), exog.view()).unwrap();
        assert_abs_diff_eq!(fit.params[0], 2.0, epsilon = 1e-10);
        assert_abs_diff_eq!(fit.params[1], -1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(fit.ssr, 0.0, epsilon = 1e-18);
        assert_eq!(fit.nobs, 5);
        assert_eq!(fit.df_resid, 3);
    }

    #[test]
    fn matches_hand_computed_simple_regression() {
        // Single regressor without intercept: beta = Σxy / Σxx.
        let x = array![1.0, 2.0, 3.0, 4.0];
        let y = array![2.1, 3.9, 6.2, 7.8];
        let exog = x
            .view()
            .insert_axis(ndarray::Axis(1))
            .to_owned();

        let sxy: f64 = x.iter().zip(y.iter()).map(|(a, b)| a * b).sum();
        let sxx: f64 = x.iter().map(|a| a * a).sum();
        let beta = sxy / sxx;
        let ssr: f64 = x
            .iter()
            .zip(y.iter())
            .map(|(a, b)| (b - beta * a).powi(2))
            .sum();

        let fit = fit(y.view(), exog.view()).unwrap();
        assert_abs_diff_eq!(fit.params[0], beta, epsilon = 1e-12);
        assert_abs_diff_eq!(fit.ssr, ssr, epsilon = 1e-12);
        assert_abs_diff_eq!(fit.normalized_cov_params[[0, 0]], 1.0 / sxx, epsilon = 1e-12);
        let expected_bse = (fit.scale / sxx).sqrt();
        assert_abs_diff_eq!(fit.bse[0], expected_bse, epsilon = 1e-12);
    }

    #[test]
    fn rejects_mismatched_rows_and_empty_designs() {
        let endog = array![1.0, 2.0, 3.0];
        let exog = array![[1.0], [2.0]];
        assert!(matches!(
            fit(endog.view(), exog.view()),
            Err(OlsError::DimensionMismatch {
                endog_rows: 3,
                exog_rows: 2
            })
        ));

        let empty = Array2::<f64>::zeros((3, 0));
        assert!(matches!(
            fit(endog.view(), empty.view()),
            Err(OlsError::EmptyDesign)
        ));
    }
}
