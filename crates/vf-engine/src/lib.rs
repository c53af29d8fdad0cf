//! Inference orchestration engine for text-to-video generation.
//!
//! The engine drives one of several interchangeable model tiers under
//! strict resource and concurrency limits: submissions are validated
//! and admitted into a bounded FIFO queue, a single worker loop
//! executes them against a lazily-loaded model chosen by the fallback
//! chain, failures are classified and recovered where possible, and a
//! storage janitor keeps the output directory within its retention
//! policy.
//!
//! The generative models themselves are opaque: embedders supply a
//! [`backend::ModelBackend`] that loads and invokes them by tier.

pub mod backend;
pub mod config;
pub mod engine;
mod executor;
pub mod janitor;
pub mod job;
pub mod loader;
pub mod probe;
pub mod queue;
pub mod validate;

pub use engine::VideoEngine;
pub use vf_core::{ModelTier, Precision, Resolution, Submission};
