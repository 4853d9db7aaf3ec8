//! Low-level building blocks for custom pipelines.
//!
//! These expose the backend implementations, the patch metric and the
//! knee-point selection directly. Most users should prefer
//! [`StyleTransfer`](crate::StyleTransfer) and the checked wrappers in
//! [`crate::algorithm`].

pub use crate::backend::cpu::CpuBackend;
#[cfg(feature = "rayon")]
pub use crate::backend::rayon::RayonBackend;
pub use crate::metric::{mean_error, PatchImages, PatchMetric};
pub use crate::nnf::knee::{knee_point_blacklist, KneeSelection};
