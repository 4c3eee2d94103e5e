// src/testgen/mod.rs
//
// Deterministic synthetic audio for tests and demos: cue tone bursts,
// seeded background noise, click distractors and WAV export.

use std::f64::consts::PI;
use std::path::Path;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::core::Signal;

/// A windowed tone, optionally swept linearly from `start_hz` to `end_hz`
#[derive(Debug, Clone, PartialEq)]
pub struct ToneBurst {
    pub start_hz: f64,
    pub end_hz: f64,
    pub duration_seconds: f64,
    /// `(frequency multiple, relative gain)` partials added to the fundamental
    pub harmonics: Vec<(f64, f64)>,
    pub attack_seconds: f64,
    pub release_seconds: f64,
    pub amplitude: f64,
}

impl ToneBurst {
    pub fn tone(frequency_hz: f64, duration_seconds: f64) -> Self {
        Self::chirp(frequency_hz, frequency_hz, duration_seconds)
    }

    pub fn chirp(start_hz: f64, end_hz: f64, duration_seconds: f64) -> Self {
        Self {
            start_hz,
            end_hz,
            duration_seconds,
            harmonics: Vec::new(),
            attack_seconds: 0.01,
            release_seconds: 0.02,
            amplitude: 0.5,
        }
    }

    pub fn harmonic(mut self, multiple: f64, gain: f64) -> Self {
        self.harmonics.push((multiple, gain));
        self
    }

    pub fn envelope(mut self, attack_seconds: f64, release_seconds: f64) -> Self {
        self.attack_seconds = attack_seconds.max(0.0);
        self.release_seconds = release_seconds.max(0.0);
        self
    }

    pub fn amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    fn gain_at(&self, t: f64) -> f64 {
        let rise = if self.attack_seconds > 0.0 {
            (t / self.attack_seconds).min(1.0)
        } else {
            1.0
        };
        let fall = if self.release_seconds > 0.0 {
            ((self.duration_seconds - t) / self.release_seconds).min(1.0)
        } else {
            1.0
        };
        rise.min(fall).max(0.0)
    }

    /// Instantaneous value `t` seconds after onset; zero outside the burst
    pub fn value_at(&self, t: f64) -> f64 {
        if !(0.0..self.duration_seconds).contains(&t) {
            return 0.0;
        }
        let sweep = (self.end_hz - self.start_hz) / (2.0 * self.duration_seconds);
        let phase = 2.0 * PI * (self.start_hz * t + sweep * t * t);

        let mut value = phase.sin();
        for &(multiple, gain) in &self.harmonics {
            value += gain * (multiple * phase).sin();
        }
        self.amplitude * self.gain_at(t) * value
    }

    /// The burst alone, starting at sample zero
    pub fn render(&self, sample_rate: u32) -> Signal {
        let n = (self.duration_seconds * sample_rate as f64).ceil().max(0.0) as usize;
        let samples = (0..n)
            .map(|i| self.value_at(i as f64 / sample_rate as f64) as f32)
            .collect();
        Signal::new(samples, sample_rate)
    }
}

/// Stock "count" cue: 880 Hz with a weak octave, 0.9 s
pub fn count_cue() -> ToneBurst {
    ToneBurst::tone(880.0, 0.9).harmonic(2.0, 0.3).envelope(0.01, 0.05)
}

/// Stock "go" cue: rising 1250 to 1400 Hz sweep, 0.5 s
pub fn go_cue() -> ToneBurst {
    ToneBurst::chirp(1250.0, 1400.0, 0.5).envelope(0.005, 0.03)
}

/// Builds a mono scene of cues over seeded Gaussian noise.
///
/// Cue onsets may fall between samples; each burst is evaluated at the exact
/// sample times, so the rendered onset keeps its fractional position.
#[derive(Debug, Clone)]
pub struct SceneBuilder {
    sample_rate: u32,
    duration_seconds: f64,
    seed: u64,
    noise: f64,
    cues: Vec<(ToneBurst, f64)>,
    clicks: Vec<(f64, f32)>,
}

impl SceneBuilder {
    pub fn new(sample_rate: u32, duration_seconds: f64) -> Self {
        Self {
            sample_rate,
            duration_seconds,
            seed: 0,
            noise: 0.0,
            cues: Vec::new(),
            clicks: Vec::new(),
        }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Standard deviation of the background noise
    pub fn noise(mut self, std_dev: f64) -> Self {
        self.noise = std_dev.max(0.0);
        self
    }

    pub fn cue(mut self, burst: &ToneBurst, at_seconds: f64) -> Self {
        self.cues.push((burst.clone(), at_seconds));
        self
    }

    /// Single-sample impulse
    pub fn click(mut self, at_seconds: f64, amplitude: f32) -> Self {
        self.clicks.push((at_seconds, amplitude));
        self
    }

    pub fn build(&self) -> Signal {
        let rate = self.sample_rate as f64;
        let n = (self.duration_seconds * rate).round().max(0.0) as usize;
        let mut samples = vec![0.0f32; n];

        if self.noise > 0.0 {
            let mut rng = StdRng::seed_from_u64(self.seed);
            for s in samples.iter_mut() {
                let z: f64 = rng.sample(StandardNormal);
                *s = (z * self.noise) as f32;
            }
        }

        for (burst, at) in &self.cues {
            let first = (at * rate).ceil().max(0.0) as usize;
            let last = (((at + burst.duration_seconds) * rate).ceil().max(0.0) as usize).min(n);
            for i in first..last {
                samples[i] += burst.value_at(i as f64 / rate - at) as f32;
            }
        }

        for &(at, amplitude) in &self.clicks {
            let i = (at * rate).round();
            if i >= 0.0 && (i as usize) < n {
                samples[i as usize] += amplitude;
            }
        }

        Signal::new(samples, self.sample_rate)
    }
}

/// Scene of count/go pairs with known ground truth
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Scenario {
    pub name: String,
    pub sample_rate: u32,
    pub duration_seconds: f64,
    pub seed: u64,
    pub noise: f64,
    /// `(count onset, go onset)` in seconds
    pub pairs: Vec<(f64, f64)>,
}

impl Scenario {
    pub fn new(name: &str, sample_rate: u32, duration_seconds: f64) -> Self {
        Self {
            name: name.to_string(),
            sample_rate,
            duration_seconds,
            seed: 0,
            noise: 0.0,
            pairs: Vec::new(),
        }
    }

    pub fn with_pair(mut self, count_at: f64, go_at: f64) -> Self {
        self.pairs.push((count_at, go_at));
        self
    }

    pub fn with_noise(mut self, noise: f64, seed: u64) -> Self {
        self.noise = noise;
        self.seed = seed;
        self
    }

    pub fn expected_starts(&self) -> Vec<f64> {
        self.pairs.iter().map(|&(count, _)| count).collect()
    }

    pub fn build(&self) -> Signal {
        let (count, go) = (count_cue(), go_cue());
        self.pairs
            .iter()
            .fold(
                SceneBuilder::new(self.sample_rate, self.duration_seconds)
                    .seed(self.seed)
                    .noise(self.noise),
                |scene, &(c, g)| scene.cue(&count, c).cue(&go, g),
            )
            .build()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)
            .with_context(|| format!("Failed to write scenario {}", path.as_ref().display()))?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read scenario {}", path.as_ref().display()))?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Write a signal as 16-bit mono PCM
pub fn write_wav<P: AsRef<Path>>(path: P, signal: &Signal) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: signal.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path.as_ref(), spec)
        .with_context(|| format!("Failed to create {}", path.as_ref().display()))?;
    for &s in signal.samples() {
        writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}
