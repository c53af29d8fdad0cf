pub mod error;
mod model_types;
pub mod params;

pub use model_types::{ModelTier, Precision};
pub use params::{Resolution, Submission, ValidatedParams};
