//! Building blocks for custom scorers and pipelines.
//!
//! Template plans, correlation kernels, rotation and the individual
//! transforms used by the searches. Most users only need the searches and
//! the built-in scorers re-exported at the crate root.

pub use crate::bank::AngleGrid;
pub use crate::candidate::{AngularSpace, BatchKind, CandidateBatch, CascadeSpace};
pub use crate::kernel::scalar::{ZnccMaskedScalar, ZnccUnmaskedScalar};
pub use crate::kernel::{Kernel, Peak};
pub use crate::template::rotate::{rotate_u8_bilinear, rotate_u8_bilinear_masked};
pub use crate::template::{MaskedTemplatePlan, TemplatePlan};
pub use crate::transform::{apply, brightness_contrast, invert, perspective_skew, skew_homography};
