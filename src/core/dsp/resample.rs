//! Band-limited sample rate conversion (rubato sinc interpolation)

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use thiserror::Error;

use super::peaks::parabolic_offset;
use crate::core::signal::Signal;

const CHUNK_SIZE: usize = 1024;

#[derive(Debug, Error)]
pub enum ResampleError {
    #[error("invalid sample rate conversion {from} Hz -> {to} Hz")]
    InvalidRate { from: u32, to: u32 },

    #[error("failed to construct resampler: {0}")]
    Construction(#[from] rubato::ResamplerConstructionError),

    #[error("resampling failed: {0}")]
    Process(#[from] rubato::ResampleError),
}

/// Resample `signal` to `target_rate`.
///
/// Output length is `round(len * target / source)` and the interpolator's
/// lag is removed, so sample `i` of the input lines up with sample
/// `i * ratio` of the output to within half an output sample. Equal rates
/// return a copy.
pub fn resample(signal: &Signal, target_rate: u32) -> Result<Signal, ResampleError> {
    let source_rate = signal.sample_rate();
    if source_rate == 0 || target_rate == 0 {
        return Err(ResampleError::InvalidRate {
            from: source_rate,
            to: target_rate,
        });
    }
    if source_rate == target_rate || signal.is_empty() {
        return Ok(Signal::new(signal.samples().to_vec(), target_rate));
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let expected = (signal.len() as f64 * ratio).round() as usize;
    let lag = impulse_lag(ratio)?;

    let output = process_all(ratio, signal.samples(), expected + lag.max(0) as usize)?;
    let mut samples: Vec<f32> = if lag >= 0 {
        output.into_iter().skip(lag as usize).take(expected).collect()
    } else {
        std::iter::repeat(0.0)
            .take(lag.unsigned_abs())
            .chain(output)
            .take(expected)
            .collect()
    };
    samples.resize(expected, 0.0);

    Ok(Signal::new(samples, target_rate))
}

fn new_resampler(ratio: f64) -> Result<SincFixedIn<f32>, ResampleError> {
    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };
    Ok(SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_SIZE, 1)?)
}

/// Run `input` through a fresh resampler, then flush zeros until at least
/// `min_len` output samples exist
fn process_all(ratio: f64, input: &[f32], min_len: usize) -> Result<Vec<f32>, ResampleError> {
    let mut resampler = new_resampler(ratio)?;
    let mut output: Vec<f32> = Vec::with_capacity(min_len + CHUNK_SIZE);

    let mut chunks = input.chunks_exact(CHUNK_SIZE);
    for chunk in &mut chunks {
        let frames = resampler.process(&[chunk][..], None)?;
        output.extend_from_slice(&frames[0]);
    }
    let tail = chunks.remainder();
    if !tail.is_empty() {
        let frames = resampler.process_partial(Some(&[tail][..]), None)?;
        output.extend_from_slice(&frames[0]);
    }

    while output.len() < min_len {
        let frames = resampler.process_partial(None::<&[&[f32]]>, None)?;
        if frames[0].is_empty() {
            break;
        }
        output.extend_from_slice(&frames[0]);
    }
    Ok(output)
}

/// Output samples by which an input impulse lands after its ideal position
/// (negative when it lands early), measured through the same interpolator
fn impulse_lag(ratio: f64) -> Result<isize, ResampleError> {
    let at = CHUNK_SIZE / 2;
    let mut impulse = vec![0.0f32; 2 * CHUNK_SIZE];
    impulse[at] = 1.0;

    let min_len = (impulse.len() as f64 * ratio).ceil() as usize;
    let response = process_all(ratio, &impulse, min_len)?;
    let peak = match response
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
    {
        Some((i, _)) => i,
        None => return Ok(0),
    };

    let refined = if peak > 0 && peak + 1 < response.len() {
        let y = |i: usize| response[i] as f64;
        peak as f64 + parabolic_offset(y(peak - 1), y(peak), y(peak + 1)).unwrap_or(0.0)
    } else {
        peak as f64
    };
    Ok((refined - at as f64 * ratio).round() as isize)
}
