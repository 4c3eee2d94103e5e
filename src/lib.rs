//! cuewatch - Find count→go cue sequences in long audio recordings
//!
//! Two short reference clips (a "count" cue and a "go" cue) are matched
//! against a long, noisy recording. Each cue class runs through the same
//! pipeline, and the matched cues are then paired in time.
//!
//! ## Pipeline
//!
//! 1. **Template**: trim the clip, strip leading/trailing silence, resample to
//!    the working rate, fingerprint the dominant frequency band
//! 2. **Correlation**: normalized cross-correlation over the band-passed
//!    target, peaks refined to sub-sample precision
//! 3. **Spectral validation**: each peak's window is compared with the
//!    template spectrum
//! 4. **Aggregation**: near-duplicate candidates collapse to the most
//!    confident one
//! 5. **Pattern matching**: counts pair with gos inside the gap range;
//!    overlapping pairings keep the best
//!
//! ## Module Structure
//!
//! - `core` - Signal, DSP primitives, the detection stages and the analyzer
//! - `config` - Detection configuration and profiles
//! - `detection` - Result types and ground-truth evaluation
//! - `cli` - Command-line interface
//! - `testgen` - Deterministic synthetic cues and scenes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cuewatch::config::ProfilePreset;
//! use cuewatch::core::AnalyzerBuilder;
//!
//! let analyzer = AnalyzerBuilder::new()
//!     .profile(ProfilePreset::NoisyLive)
//!     .build("count.wav", "go.wav")?;
//! let report = analyzer.analyze_file("rehearsal.flac")?;
//!
//! for p in &report.patterns {
//!     println!("#{} count {:.3} s, go {:.3} s", p.sequence, p.pattern.count.time_offset, p.pattern.go.time_offset);
//! }
//! ```
//!
//! ## Profiles
//!
//! | Profile        | Use Case                          | Key Adjustments                 |
//! |----------------|-----------------------------------|---------------------------------|
//! | Standard       | Long recordings, background noise | Low thresholds, 3 s spacing     |
//! | Original       | Clean single-cue search           | 0.8 / 0.6 thresholds            |
//! | Conservative   | Few false positives               | High thresholds, capped count   |
//! | Sensitive      | Faint cues                        | Lower thresholds                |
//! | Aggressive     | Very faint cues                   | Lowest thresholds               |
//! | StudioQuality  | Clean studio captures             | Narrow band                     |
//! | NoisyLive      | Crowd noise                       | Wide band, longer go template   |

// Core detection pipeline
pub mod core;

// Command-line interface
pub mod cli;

// Configuration and profiles
pub mod config;

// Detection result types
pub mod detection;

// Synthetic test signals
pub mod testgen;

// Re-export commonly used types at crate root for convenience
pub use config::{ConfigError, DetectionConfig, PatternParams, ProfileBuilder, ProfilePreset};
pub use core::analysis::match_patterns;
pub use core::{
    build_template, detect_candidates, AnalyzerBuilder, CueAnalyzer, DetectError,
    DetectionParams, Signal, Template, TemplateError,
};
pub use detection::{Candidate, CueClass, DetectionReport, Pattern};
