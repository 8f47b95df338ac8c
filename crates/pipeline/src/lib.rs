//! The three stages of a run, sequenced over a [`RunContext`]:
//!
//! 1. [`extract::extract_frames`] decodes the upload into numbered frames.
//! 2. [`detect::detect_frames`] annotates each frame and writes the tally
//!    report.
//! 3. [`assemble::assemble_video`] re-encodes the annotated frames.
//!
//! Each stage returns a summary on success and a [`PipelineError`] naming
//! the stage on failure.
//!
//! [`RunContext`]: vidtally_core::run::RunContext

pub mod assemble;
pub mod detect;
pub mod error;
pub mod extract;
pub mod settings;

pub use error::{PipelineError, Stage};
pub use settings::PipelineSettings;
