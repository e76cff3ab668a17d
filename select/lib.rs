#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]

//! Variable selection for linear models without refitting.
//!
//! Two independent engines share one design goal: extract the fit statistics
//! of many candidate models from a single decomposition of the data, instead
//! of running a full least-squares fit per candidate.
//!
//! - [`sequential::SequentialQr`] factors `[X y]` once with QR and reads off
//!   the residual and explained sums of squares of every nested prefix model,
//!   then minimizes an information criterion over them.
//! - [`sweep::SweepEngine`] holds the cross-product (moment) matrix of the
//!   data and toggles predictors in and out of the model with the sweep
//!   operator, an O(k²) rank-one update. Candidate moves can be priced
//!   (RSS change, new coefficients, F test) without committing them.
//!
//! The authoritative inference object for a chosen subset comes from a plain
//! least-squares fit ([`ols::fit`]) at the end of a session.

pub mod criteria;
pub mod ols;
pub mod sequential;
pub mod sweep;
