// select/sweep.rs

//! Stepwise regression via the sweep operator on a cross-product matrix.
//!
//! The engine owns the (p+q)×(p+q) moment matrix `[X Y]ᵗ[X Y]` of p
//! predictors and q responses. Sweeping a predictor's pivot toggles it
//! between "conditioned out of the residual block" and "restored to the raw
//! cross-product" — exactly inclusion/exclusion of that variable in a linear
//! model, at O(k²) per toggle instead of a full refit. After sweeping a set
//! of predictors, the response rows of the matrix hold their coefficients,
//! the trailing response block holds the residual sums of squares, and the
//! swept diagonal holds `(X_SᵗX_S)⁻¹` entries.
//!
//! Candidate moves can be priced without committing them: [`SweepEngine::rss_delta`]
//! gives the RSS change any single toggle would cause, [`SweepEngine::params_if_swept`]
//! the coefficients after any single toggle, and [`SweepEngine::ftest_sweep`] an F test
//! against the one-variable-larger model. Only [`SweepEngine::sweep`] mutates.
//!
//! Sweeping is self-inverse, so sweeping an index twice restores the original
//! sub-blocks in exact arithmetic; floating-point round-off accumulates over
//! long sweep chains, and callers needing high precision after many toggles
//! should rebuild the engine from the raw data instead of relying on
//! double-sweep inversion. The engine is not reentrant: a commit changes the
//! basis for every subsequent read.

use crate::ols::{self, OlsFit};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SweepError {
    #[error(
        "cannot sweep variable {index}: its diagonal cross-product entry is exactly zero (degenerate or perfectly collinear column)"
    )]
    SingularPivot { index: usize },
    #[error("pivot index {index} is out of range: valid pivots are 0..{limit}")]
    PivotOutOfRange { index: usize, limit: usize },
    #[error("response has {endog_rows} rows but the predictor matrix has {exog_rows}; the two must agree")]
    DimensionMismatch { endog_rows: usize, exog_rows: usize },
    #[error("at least one observation is required")]
    NoObservations,
    #[error("column {column} has zero or non-finite scale; standardized mode requires every column to vary")]
    ZeroVariance { column: usize },
    #[error("operation is only implemented for a single response variable (this engine has {k_vars_y})")]
    MultiResponseUnsupported { k_vars_y: usize },
    #[error("F test is degenerate: residual degrees of freedom {df_full} must be positive")]
    DegenerateFTest { df_full: f64 },
    #[error("final least-squares fit failed: {0}")]
    Fit(#[from] ols::OlsError),
}

/// Elementary sweep of a symmetric matrix at pivot `k`.
///
/// Produces a new matrix `R'` with `R'[k,k] = 1/R[k,k]`, column `k` divided
/// by the pivot, row `k` divided by the negated pivot, and the standard
/// rank-one update `R'[i,j] = R[i,j] - R[i,k]·R[k,j]/R[k,k]` elsewhere. The
/// input is never mutated.
///
/// An exactly-zero pivot diagonal fails with [`SweepError::SingularPivot`];
/// a nonzero but tiny pivot is swept as-is and IEEE arithmetic decides the
/// result. Values are never clamped.
pub fn sweep_transform(rs: ArrayView2<f64>, k: usize) -> Result<Array2<f64>, SweepError> {
    let m = rs.nrows();
    debug_assert_eq!(m, rs.ncols(), "sweep requires a square matrix");
    if k >= m {
        return Err(SweepError::PivotOutOfRange { index: k, limit: m });
    }
    let rkk = rs[[k, k]];
    if rkk == 0.0 {
        return Err(SweepError::SingularPivot { index: k });
    }

    let mut next = Array2::zeros((m, m));
    for i in 0..m {
        for j in 0..m {
            next[[i, j]] = match (i == k, j == k) {
                (true, true) => 1.0 / rkk,
                (false, true) => rs[[i, k]] / rkk,
                (true, false) => -rs[[k, j]] / rkk,
                (false, false) => rs[[i, j]] - rs[[i, k]] * rs[[k, j]] / rkk,
            };
        }
    }
    Ok(next)
}

/// Snapshot of the model state right after one committed sweep.
#[derive(Debug, Clone)]
pub struct SweepRecord {
    /// Inclusion mask at the time of the commit (one flag per predictor).
    pub included: Vec<bool>,
    /// Residual q×q block at the time of the commit.
    pub rss: Array2<f64>,
    /// Coefficients (responses × included predictors) at the time of the commit.
    pub params: Array2<f64>,
}

/// Construction options for [`SweepEngine`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepOptions {
    /// Center and scale every column to zero mean and unit variance before
    /// forming the cross product. Requires that no column is constant, and
    /// adds one to `ddof_model` for the implicit centering.
    pub standardized: bool,
    /// Delta degrees of freedom for the standard-deviation denominator
    /// (`n - ddof_std`) in standardized mode.
    pub ddof_std: usize,
    /// Extra model degrees of freedom subtracted from the residual count.
    pub ddof_model: i64,
}

/// Stepwise-regression engine over a live cross-product matrix.
///
/// The engine exclusively owns the matrix and the inclusion mask and mutates
/// them together in [`Self::sweep`]; every derived quantity is freshly
/// computed on read, never an alias into the live matrix.
pub struct SweepEngine {
    endog: Array2<f64>,
    exog: Array2<f64>,
    nobs: usize,
    k_vars_x: usize,
    k_vars_y: usize,
    ddof_model: i64,
    ddof_std: usize,
    mean_data: Array1<f64>,
    std_data: Array1<f64>,
    rs0: Array2<f64>,
    rs_current: Array2<f64>,
    included: Vec<bool>,
    history: Vec<SweepRecord>,
}

impl SweepEngine {
    /// Build an engine for a single response. See [`Self::new_multi`].
    pub fn new(
        endog: ArrayView1<f64>,
        exog: ArrayView2<f64>,
        options: SweepOptions,
    ) -> Result<Self, SweepError> {
        Self::new_multi(endog.insert_axis(Axis(1)), exog, options)
    }

    /// Build an engine from `n×q` responses and `n×p` predictors.
    ///
    /// The cross-product matrix is formed with predictors first and
    /// responses in the trailing rows/columns. Multi-response engines can be
    /// swept and expose the `rss`/`params` blocks, but candidate evaluation
    /// and F tests are only implemented for `q == 1`.
    pub fn new_multi(
        endog: ArrayView2<f64>,
        exog: ArrayView2<f64>,
        options: SweepOptions,
    ) -> Result<Self, SweepError> {
        if endog.nrows() != exog.nrows() {
            return Err(SweepError::DimensionMismatch {
                endog_rows: endog.nrows(),
                exog_rows: exog.nrows(),
            });
        }
        let nobs = exog.nrows();
        if nobs == 0 {
            return Err(SweepError::NoObservations);
        }
        let k_vars_x = exog.ncols();
        let k_vars_y = endog.ncols();
        let k_all = k_vars_x + k_vars_y;

        let mut xy = Array2::zeros((nobs, k_all));
        xy.slice_mut(s![.., ..k_vars_x]).assign(&exog);
        xy.slice_mut(s![.., k_vars_x..]).assign(&endog);

        let n = nobs as f64;
        let mean_data = xy.mean_axis(Axis(0)).expect("nobs > 0 checked above");
        let std_data = Array1::from_shape_fn(k_all, |j| {
            let mean = mean_data[j];
            let ss: f64 = xy.column(j).iter().map(|&v| (v - mean).powi(2)).sum();
            (ss / (n - options.ddof_std as f64)).sqrt()
        });

        let mut ddof_model = options.ddof_model;
        if options.standardized {
            for j in 0..k_all {
                let scale = std_data[j];
                if !(scale.is_finite() && scale > 0.0) {
                    return Err(SweepError::ZeroVariance { column: j });
                }
                let mean = mean_data[j];
                xy.column_mut(j).mapv_inplace(|v| (v - mean) / scale);
            }
            // The implicit centering estimates one parameter per response.
            ddof_model += 1;
        }

        let rs0 = xy.t().dot(&xy);
        log::debug!(
            "sweep engine: {nobs} observations, {k_vars_x} predictors, {k_vars_y} responses{}",
            if options.standardized { ", standardized" } else { "" }
        );

        Ok(Self {
            endog: endog.to_owned(),
            exog: exog.to_owned(),
            nobs,
            k_vars_x,
            k_vars_y,
            ddof_model,
            ddof_std: options.ddof_std,
            mean_data,
            std_data,
            rs0: rs0.clone(),
            rs_current: rs0,
            included: vec![false; k_vars_x],
            history: Vec::new(),
        })
    }

    pub fn nobs(&self) -> usize {
        self.nobs
    }

    pub fn k_vars_x(&self) -> usize {
        self.k_vars_x
    }

    pub fn k_vars_y(&self) -> usize {
        self.k_vars_y
    }

    pub fn ddof_model(&self) -> i64 {
        self.ddof_model
    }

    pub fn ddof_std(&self) -> usize {
        self.ddof_std
    }

    /// Per-column means of `[X Y]` recorded at construction.
    pub fn mean_data(&self) -> ArrayView1<'_, f64> {
        self.mean_data.view()
    }

    /// Per-column standard deviations of `[X Y]` recorded at construction.
    pub fn std_data(&self) -> ArrayView1<'_, f64> {
        self.std_data.view()
    }

    /// The raw moment matrix the engine started from. Kept so callers can
    /// rebuild state after long sweep chains instead of trusting double-sweep
    /// inversion.
    pub fn initial_cross_product(&self) -> ArrayView2<'_, f64> {
        self.rs0.view()
    }

    /// The live cross-product matrix. The borrow prevents commits while the
    /// view is held.
    pub fn cross_product(&self) -> ArrayView2<'_, f64> {
        self.rs_current.view()
    }

    /// One flag per predictor; `included[k]` iff `k` has been swept an odd
    /// number of times.
    pub fn included(&self) -> &[bool] {
        &self.included
    }

    pub fn n_included(&self) -> usize {
        self.included.iter().filter(|&&flag| flag).count()
    }

    /// One snapshot per committed sweep, in commit order. Never pruned.
    pub fn history(&self) -> &[SweepRecord] {
        &self.history
    }

    /// Residual q×q block for the current model (freshly copied).
    pub fn rss(&self) -> Array2<f64> {
        self.rs_current
            .slice(s![self.k_vars_x.., self.k_vars_x..])
            .to_owned()
    }

    /// Residual sum of squares of the last response; the single-response
    /// convenience accessor.
    pub fn rss_scalar(&self) -> f64 {
        let last = self.k_vars_x + self.k_vars_y - 1;
        self.rs_current[[last, last]]
    }

    /// Current coefficients, one row per response and one column per
    /// included predictor (in predictor-index order).
    pub fn params(&self) -> Array2<f64> {
        let cols: Vec<usize> = self.included_indices();
        let mut params = Array2::zeros((self.k_vars_y, cols.len()));
        for (out_col, &j) in cols.iter().enumerate() {
            for row in 0..self.k_vars_y {
                params[[row, out_col]] = self.rs_current[[self.k_vars_x + row, j]];
            }
        }
        params
    }

    /// Residual degrees of freedom: `n - #included - ddof_model`.
    pub fn df_resid(&self) -> i64 {
        self.nobs as i64 - self.n_included() as i64 - self.ddof_model
    }

    /// Error-variance estimate `rss / df_resid` for the last response.
    pub fn scale2(&self) -> f64 {
        self.rss_scalar() / self.df_resid() as f64
    }

    /// Diagonal of `(X_SᵗX_S)⁻¹` for the included predictor set, in
    /// predictor-index order.
    pub fn normalized_cov_params(&self) -> Array1<f64> {
        let cols = self.included_indices();
        Array1::from_shape_fn(cols.len(), |i| {
            let j = cols[i];
            self.rs_current[[j, j]]
        })
    }

    /// Standard error per included coefficient.
    pub fn bse(&self) -> Array1<f64> {
        let scale2 = self.scale2();
        self.normalized_cov_params().mapv(|v| (v * scale2).sqrt())
    }

    fn included_indices(&self) -> Vec<usize> {
        self.included
            .iter()
            .enumerate()
            .filter_map(|(j, &flag)| flag.then_some(j))
            .collect()
    }

    fn require_single_response(&self) -> Result<(), SweepError> {
        if self.k_vars_y != 1 {
            return Err(SweepError::MultiResponseUnsupported {
                k_vars_y: self.k_vars_y,
            });
        }
        Ok(())
    }

    fn check_pivot(&self, k: usize) -> Result<(), SweepError> {
        if k >= self.k_vars_x {
            return Err(SweepError::PivotOutOfRange {
                index: k,
                limit: self.k_vars_x,
            });
        }
        Ok(())
    }

    /// Signed RSS change each single-variable toggle would cause, one entry
    /// per predictor. Negative for currently-excluded variables (entering
    /// reduces or preserves the RSS), positive for included ones (leaving
    /// increases or preserves it). Single-response only.
    pub fn rss_delta(&self) -> Result<Array1<f64>, SweepError> {
        self.require_single_response()?;
        let rr = &self.rs_current;
        let last = self.k_vars_x;
        Ok(Array1::from_shape_fn(self.k_vars_x, |j| {
            let magnitude = rr[[last, j]].powi(2) / rr[[j, j]];
            if self.included[j] { magnitude } else { -magnitude }
        }))
    }

    /// Hypothetical RSS after each single-variable toggle:
    /// `rss_scalar() + rss_delta()`.
    pub fn rss_new(&self) -> Result<Array1<f64>, SweepError> {
        let rss = self.rss_scalar();
        Ok(self.rss_delta()?.mapv(|delta| rss + delta))
    }

    /// Full p×p matrix of coefficient vectors after hypothetical toggles.
    ///
    /// Row `k` holds the coefficients of every predictor if `k` were swept:
    /// entries for excluded predictors are zero, and the diagonal holds the
    /// variable's own coefficient-if-entered (zero when it is already in).
    /// Single-response only.
    pub fn params_if_swept(&self) -> Result<Array2<f64>, SweepError> {
        self.require_single_response()?;
        let kx = self.k_vars_x;
        let rr = &self.rs_current;
        let last = kx;

        let mut params = Array2::zeros((kx, kx));
        for k in 0..kx {
            for j in 0..kx {
                if k == j {
                    if !self.included[k] {
                        params[[k, k]] = rr[[last, k]] / rr[[k, k]];
                    }
                } else if self.included[j] {
                    params[[k, j]] = rr[[last, j]] - rr[[last, k]] * rr[[k, j]] / rr[[k, k]];
                }
            }
        }
        Ok(params)
    }

    /// Change in every coefficient for each hypothetical toggle: current
    /// coefficients (zero for excluded predictors) minus
    /// [`Self::params_if_swept`]. Single-response only.
    pub fn params_delta(&self) -> Result<Array2<f64>, SweepError> {
        let params_next = self.params_if_swept()?;
        let kx = self.k_vars_x;
        let rr = &self.rs_current;
        let current = Array1::from_shape_fn(kx, |j| {
            if self.included[j] { rr[[kx, j]] } else { 0.0 }
        });

        let mut delta = Array2::zeros((kx, kx));
        for k in 0..kx {
            for j in 0..kx {
                delta[[k, j]] = current[j] - params_next[[k, j]];
            }
        }
        Ok(delta)
    }

    /// F test of each single-variable toggle against the one-variable-larger
    /// model, with everything the caller needs to recompute p-values.
    ///
    /// Only the entering direction (currently-excluded variables) is
    /// numerically validated; entries for included variables use the same
    /// formula but are not guaranteed correct. Single-response only.
    pub fn ftest_sweep(&self) -> Result<SweepFTest, SweepError> {
        self.require_single_response()?;
        let ssr_diff = self.rss_delta()?;
        let rss = self.rss_scalar();
        let df_resid = self.df_resid() as f64;

        let kx = self.k_vars_x;
        let mut f_values = Array1::zeros(kx);
        let mut p_values = Array1::zeros(kx);
        let mut ssr_full = Array1::zeros(kx);
        let mut df_full = Array1::zeros(kx);
        for j in 0..kx {
            let entering = !self.included[j];
            ssr_full[j] = rss + if entering { ssr_diff[j] } else { 0.0 };
            df_full[j] = df_resid - if entering { 1.0 } else { 0.0 };
            if df_full[j] <= 0.0 {
                return Err(SweepError::DegenerateFTest { df_full: df_full[j] });
            }
            f_values[j] = ssr_diff[j].abs() / ssr_full[j] * df_full[j];
            let dist = FisherSnedecor::new(1.0, df_full[j])
                .map_err(|_| SweepError::DegenerateFTest { df_full: df_full[j] })?;
            p_values[j] = 1.0 - dist.cdf(f_values[j]);
        }

        Ok(SweepFTest {
            f_values,
            p_values,
            ssr_diff,
            ssr_full,
            df_diff: 1.0,
            df_full,
        })
    }

    /// The transformed matrix a commit at pivot `k` would adopt, without
    /// committing it. The engine is untouched.
    pub fn sweep_preview(&self, k: usize) -> Result<Array2<f64>, SweepError> {
        self.check_pivot(k)?;
        sweep_transform(self.rs_current.view(), k)
    }

    /// Commit a sweep at pivot `k`: adopt the transformed matrix, flip
    /// `included[k]`, and append a history snapshot. The only mutating
    /// operation; there is no rollback other than sweeping `k` again.
    pub fn sweep(&mut self, k: usize) -> Result<(), SweepError> {
        self.check_pivot(k)?;
        self.rs_current = sweep_transform(self.rs_current.view(), k)?;
        self.included[k] = !self.included[k];
        log::debug!(
            "swept variable {k} ({}); {} of {} predictors included",
            if self.included[k] { "in" } else { "out" },
            self.n_included(),
            self.k_vars_x
        );
        self.history.push(SweepRecord {
            included: self.included.clone(),
            rss: self.rss(),
            params: self.params(),
        });
        Ok(())
    }

    /// Fit the currently included predictor subset by ordinary least squares
    /// on the raw data, yielding the authoritative coefficients and
    /// covariance for the selected model. Single-response only.
    pub fn fit_selected(&self) -> Result<OlsFit, SweepError> {
        self.require_single_response()?;
        let cols = self.included_indices();
        let design = self.exog.select(Axis(1), &cols);
        let fit = ols::fit(self.endog.column(0), design.view())?;
        Ok(fit)
    }
}

/// Per-predictor F test of the hypothetical single-variable toggle.
///
/// `df_diff` is always 1 (one variable moves); `df_full[j]` is the residual
/// degrees of freedom of the larger model for candidate `j`.
#[derive(Debug, Clone)]
pub struct SweepFTest {
    pub f_values: Array1<f64>,
    pub p_values: Array1<f64>,
    pub ssr_diff: Array1<f64>,
    pub ssr_full: Array1<f64>,
    pub df_diff: f64,
    pub df_full: Array1<f64>,
}
