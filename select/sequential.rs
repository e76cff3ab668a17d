// select/sequential.rs

//! Sequential nested-model evaluation from one QR factorization.
//!
//! Given a response `y` and predictors `X` whose columns are already ordered
//! by entry priority, the QR factorization of `[X y]` yields every nested
//! prefix model's fit statistics at once: the last diagonal entry of `R`
//! squared is the full model's residual sum of squares, and `R[i, k]²` for
//! `i < k` is the orthogonal contribution of column `i` to the explained sum
//! of squares. Cumulative sums over those contributions give the residual and
//! explained sums of squares of the model containing the first `j + 1`
//! columns, without refitting any of them.
//!
//! The partial results are only meaningful for the chosen column order;
//! reordering `X` changes every prefix statistic. All sums of squares are
//! uncentered — an intercept, if wanted, must be an explicit column (and
//! `start_idx` can force it to stay in every candidate model).

use crate::criteria::{self, Criterion};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use ndarray_linalg::{Inverse, QR};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SequentialError {
    #[error("response has {endog_rows} rows but the predictor matrix has {exog_rows}; the two must agree")]
    DimensionMismatch { endog_rows: usize, exog_rows: usize },
    #[error("the predictor matrix has no columns; at least one candidate variable is required")]
    EmptyDesign,
    #[error("start index {start_idx} is out of range for {k_vars} candidate variables")]
    StartIndexOutOfRange { start_idx: usize, k_vars: usize },
    #[error("decomposition failed: {0}")]
    Linalg(#[from] ndarray_linalg::error::LinalgError),
}

/// One-shot QR decomposition of `[X y]` with all-prefix fit statistics.
///
/// Fully computed at construction and immutable afterwards; the information
/// criterion arrays are recomputed on demand.
pub struct SequentialQr {
    endog: Array1<f64>,
    exog: Array2<f64>,
    start_idx: usize,
    nobs: usize,
    k_vars: usize,
    r: Array2<f64>,
    ssr: f64,
    ss_contrib: Array1<f64>,
    uncentered_tss: f64,
    ess_all: Array1<f64>,
    ssr_all: Array1<f64>,
    df_modelwc: Array1<f64>,
}

impl SequentialQr {
    /// Factor `[exog endog]` and precompute every prefix model's statistics.
    ///
    /// `start_idx` is the smallest model index (zero-based; the model with
    /// `start_idx + 1` variables) that [`Self::min_ic_idx`] will consider.
    pub fn new(
        endog: ArrayView1<f64>,
        exog: ArrayView2<f64>,
        start_idx: usize,
    ) -> Result<Self, SequentialError> {
        if endog.len() != exog.nrows() {
            return Err(SequentialError::DimensionMismatch {
                endog_rows: endog.len(),
                exog_rows: exog.nrows(),
            });
        }
        let k_vars = exog.ncols();
        if k_vars == 0 {
            return Err(SequentialError::EmptyDesign);
        }
        if start_idx >= k_vars {
            return Err(SequentialError::StartIndexOutOfRange { start_idx, k_vars });
        }

        let nobs = endog.len();
        let mut xy = Array2::zeros((nobs, k_vars + 1));
        xy.slice_mut(s![.., ..k_vars]).assign(&exog);
        xy.slice_mut(s![.., k_vars]).assign(&endog);
        let (_q, r) = xy.qr()?;

        let ssr = r[[k_vars, k_vars]].powi(2);
        let ss_contrib = Array1::from_shape_fn(k_vars, |i| r[[i, k_vars]].powi(2));
        let uncentered_tss = endog.dot(&endog);

        let mut ess_all = Array1::zeros(k_vars);
        let mut cumulative = 0.0;
        for (j, &contrib) in ss_contrib.iter().enumerate() {
            cumulative += contrib;
            ess_all[j] = cumulative;
        }
        let ssr_all = ess_all.mapv(|ess| uncentered_tss - ess);
        let df_modelwc = Array1::from_shape_fn(k_vars, |j| (j + 1) as f64);

        log::debug!(
            "sequential QR on {nobs} observations x {k_vars} candidates; full-model ssr {ssr:.6e}"
        );

        Ok(Self {
            endog: endog.to_owned(),
            exog: exog.to_owned(),
            start_idx,
            nobs,
            k_vars,
            r,
            ssr,
            ss_contrib,
            uncentered_tss,
            ess_all,
            ssr_all,
            df_modelwc,
        })
    }

    pub fn nobs(&self) -> usize {
        self.nobs
    }

    pub fn k_vars(&self) -> usize {
        self.k_vars
    }

    pub fn endog(&self) -> ArrayView1<'_, f64> {
        self.endog.view()
    }

    pub fn exog(&self) -> ArrayView2<'_, f64> {
        self.exog.view()
    }

    /// Triangular factor of the QR decomposition of `[X y]`, (k+1)×(k+1).
    pub fn r(&self) -> ArrayView2<'_, f64> {
        self.r.view()
    }

    /// Residual sum of squares of the full model (all `k_vars` columns).
    pub fn ssr(&self) -> f64 {
        self.ssr
    }

    /// Orthogonal per-column contribution to the explained sum of squares.
    pub fn ss_contrib(&self) -> ArrayView1<'_, f64> {
        self.ss_contrib.view()
    }

    /// Uncentered total sum of squares `yᵗy`.
    pub fn uncentered_tss(&self) -> f64 {
        self.uncentered_tss
    }

    /// `ess_all[j]`: explained sum of squares with the first `j + 1` columns.
    pub fn ess_all(&self) -> ArrayView1<'_, f64> {
        self.ess_all.view()
    }

    /// `ssr_all[j]`: residual sum of squares with the first `j + 1` columns.
    /// Non-increasing in `j`; `ess_all[j] + ssr_all[j]` equals the total sum
    /// of squares for every `j`.
    pub fn ssr_all(&self) -> ArrayView1<'_, f64> {
        self.ssr_all.view()
    }

    /// Model degrees of freedom per prefix model (`j + 1` counted parameters).
    pub fn df_modelwc(&self) -> ArrayView1<'_, f64> {
        self.df_modelwc.view()
    }

    /// Inverse of the predictor block `R[..k, ..k]` of the triangular factor.
    pub fn r_inv(&self) -> Result<Array2<f64>, SequentialError> {
        let rx = self.r.slice(s![..self.k_vars, ..self.k_vars]).to_owned();
        Ok(rx.inv()?)
    }

    /// `(XᵗX)⁻¹ = R⁻¹ R⁻ᵗ` for the full predictor set.
    pub fn normalized_cov_params(&self) -> Result<Array2<f64>, SequentialError> {
        let r_inv = self.r_inv()?;
        Ok(r_inv.dot(&r_inv.t()))
    }

    /// Concentrated Gaussian log-likelihood of every prefix model.
    pub fn llf_all(&self) -> Array1<f64> {
        criteria::loglike_ssr(&self.ssr_all, self.nobs)
    }

    /// One criterion value per prefix model; smaller is better.
    pub fn ic_all(&self, criterion: Criterion) -> Array1<f64> {
        criterion.evaluate(&self.ssr_all, self.nobs, &self.df_modelwc)
    }

    /// Index of the criterion-minimal prefix model, searched from
    /// `start_idx` onward. The returned index is zero-based: index `j` means
    /// the model with the first `j + 1` columns.
    pub fn min_ic_idx(&self, criterion: Criterion) -> usize {
        let ic = self.ic_all(criterion);
        let mut best = self.start_idx;
        for j in (self.start_idx + 1)..self.k_vars {
            if ic[j] < ic[best] {
                best = j;
            }
        }
        best
    }
}
