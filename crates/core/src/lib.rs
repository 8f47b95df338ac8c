//! Domain building blocks for the vidtally pipeline.
//!
//! Everything here is free of HTTP and model concerns: ffmpeg invocation,
//! frame file naming and ordering, the CSV tally report, and the per-run
//! working directory layout.

pub mod error;
pub mod ffmpeg;
pub mod frames;
pub mod naming;
pub mod run;
pub mod tally;
