// select/criteria.rs

//! Information criteria for comparing nested linear models.
//!
//! Each criterion trades goodness of fit against model size. The `*Sigma`
//! variants are evaluated directly on the residual variance `σ² = ssr / n`;
//! the plain variants are evaluated on the Gaussian concentrated
//! log-likelihood. Both families are vectorized over an array of nested-model
//! residual sums of squares so a whole selection path is scored in one call.
//!
//! Criterion lookup is an explicit enum with a `FromStr` impl; an unknown key
//! fails with [`CriterionError::Unsupported`] rather than a generic lookup
//! error.

use ndarray::{Array1, Zip};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CriterionError {
    #[error(
        "unsupported information criterion '{0}' (expected one of: aic, bic, hqic, aic_sigma, bic_sigma, hqic_sigma)"
    )]
    Unsupported(String),
}

/// Penalized-fit score used to pick a model size.
///
/// The plain variants apply the penalty to `-2·llf`; the sigma variants apply
/// a per-observation penalty to `log(ssr/n)`. Both rank models identically up
/// to monotone transformations, but their numeric values differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    Aic,
    Bic,
    Hqic,
    AicSigma,
    BicSigma,
    HqicSigma,
}

impl Criterion {
    /// True for the `*_sigma` family, which scores `log(ssr/n)` directly
    /// instead of going through the log-likelihood.
    pub fn is_sigma_form(self) -> bool {
        matches!(
            self,
            Criterion::AicSigma | Criterion::BicSigma | Criterion::HqicSigma
        )
    }

    /// Per-parameter penalty weight of this criterion at sample size `nobs`.
    fn penalty(self, nobs: usize) -> f64 {
        let n = nobs as f64;
        match self {
            Criterion::Aic | Criterion::AicSigma => 2.0,
            Criterion::Bic | Criterion::BicSigma => n.ln(),
            Criterion::Hqic | Criterion::HqicSigma => 2.0 * n.ln().ln(),
        }
    }

    /// Score every model in a selection path.
    ///
    /// `ssr_all[j]` is the residual sum of squares of the j-th model and
    /// `df_modelwc[j]` its model degrees of freedom (all counted parameters).
    /// Returns one criterion value per model; smaller is better.
    pub fn evaluate(
        self,
        ssr_all: &Array1<f64>,
        nobs: usize,
        df_modelwc: &Array1<f64>,
    ) -> Array1<f64> {
        let n = nobs as f64;
        let penalty = self.penalty(nobs);
        if self.is_sigma_form() {
            Zip::from(ssr_all)
                .and(df_modelwc)
                .map_collect(|&ssr, &df| (ssr / n).ln() + penalty * df / n)
        } else {
            let llf = loglike_ssr(ssr_all, nobs);
            Zip::from(&llf)
                .and(df_modelwc)
                .map_collect(|&l, &df| -2.0 * l + penalty * df)
        }
    }
}

impl FromStr for Criterion {
    type Err = CriterionError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "aic" => Ok(Criterion::Aic),
            "bic" => Ok(Criterion::Bic),
            "hqic" => Ok(Criterion::Hqic),
            "aic_sigma" => Ok(Criterion::AicSigma),
            "bic_sigma" => Ok(Criterion::BicSigma),
            "hqic_sigma" => Ok(Criterion::HqicSigma),
            other => Err(CriterionError::Unsupported(other.to_string())),
        }
    }
}

/// Gaussian concentrated log-likelihood from a residual sum of squares:
/// `-n/2 · (log 2π + log(ssr/n) + 1)`, vectorized over an SSR array.
pub fn loglike_ssr(ssr: &Array1<f64>, nobs: usize) -> Array1<f64> {
    ssr.mapv(|s| loglike_ssr_scalar(s, nobs))
}

/// Scalar form of [`loglike_ssr`] for a single model.
pub fn loglike_ssr_scalar(ssr: f64, nobs: usize) -> f64 {
    let n = nobs as f64;
    -0.5 * n * ((2.0 * std::f64::consts::PI).ln() + (ssr / n).ln() + 1.0)
}
