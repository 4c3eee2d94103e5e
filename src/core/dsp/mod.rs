//! Digital Signal Processing utilities

pub mod fft;
pub mod filters;
pub mod peaks;
pub mod resample;
pub mod stats;
pub mod windows;

pub use fft::{analytic_signal, hilbert_envelope, FftProcessor};
pub use filters::{moving_average, BandPass};
pub use peaks::{find_peaks, local_maxima, parabolic_offset, parabolic_vertex, PeakCriteria};
pub use resample::{resample, ResampleError};
pub use stats::{pearson, rms, Summary};
pub use windows::{create_window, WindowType};
