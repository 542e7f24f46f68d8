//! Checks of the predictive inference API shared by gaussbox GP models.
//!
//! The harness is made of three layers applied in sequence:
//! * a model factory, [`ModelSetup`], building any variant (GPR, SGPR, FITC, SVGP, VGP, GPMC, SGPMC)
//!   as a [`gaussbox_gp::GpPredictor`] trait object,
//! * the predictions of the [`gaussbox_gp::GpPredictor`] trait: mean and variance, full covariance,
//!   log density and samples,
//! * assertions comparing arrays with tolerances and shapes ([`check_allclose`], [`check_shape`]).
//!
//! Cases in [`cases`] tie them together and [`run_table`] runs one case over a table of setups.
//!
//! ```
//! use gaussbox_check::{cases, RandomData};
//!
//! let mut data = RandomData::new(0);
//! let passed = cases::run_table(
//!     &cases::model_setups(),
//!     &cases::FULL_COV_DIMS,
//!     &mut data,
//!     |setup, problem, _| cases::check_full_cov(setup, problem),
//! )
//! .expect("full covariance checks");
//! assert_eq!(passed, 10);
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
pub mod cases;
mod checks;
mod data;
mod errors;
mod setup;

pub use cases::run_table;
pub use checks::*;
pub use data::*;
pub use errors::*;
pub use setup::*;
