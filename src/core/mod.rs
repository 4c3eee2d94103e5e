//! Core detection pipeline
//!
//! - `signal`: immutable mono sample buffer
//! - `dsp`: FFT, filtering, peak picking and resampling primitives
//! - `template`: reference clip preprocessing
//! - `analysis`: correlation, spectral validation, aggregation, pattern matching
//! - `detector`: one cue pipeline end to end
//! - `decoder` / `analyzer`: file I/O and the two-class orchestrator

pub mod analysis;
pub mod analyzer;
pub mod decoder;
pub mod detector;
pub mod dsp;
pub mod signal;
pub mod template;

pub use analyzer::{AnalyzerBuilder, CueAnalyzer};
pub use decoder::{decode_audio, load_signal, DecodeError, DecodedAudio};
pub use detector::{detect_candidates, detect_raw_candidates, DetectError, DetectionParams};
pub use signal::Signal;
pub use template::{build_template, build_template_with, Template, TemplateError, TemplateSettings};
