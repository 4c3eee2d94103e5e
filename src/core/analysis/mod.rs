//! Detection stages
//!
//! - Correlation: normalized cross-correlation and raw peak extraction
//! - Spectral: template fingerprinting and peak corroboration
//! - Aggregate: duplicate suppression within one cue class
//! - Pattern: count/go pairing and overlap resolution
//!
//! Everything here is pure computation over borrowed buffers.

mod aggregate;
mod correlation;
mod pattern;
mod spectral;

pub use aggregate::{aggregate, deduplicate, AggregateParams};
pub use correlation::{CorrelationCurve, Correlator, PeakSearch, Peaks, RawPeak};
pub use pattern::{match_patterns, pair_candidates, resolve_overlaps};
pub use spectral::{FrequencyBand, SpectralFingerprint, SpectralValidator};
