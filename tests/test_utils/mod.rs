// tests/test_utils/mod.rs
//
// Shared fixtures: synthetic cue clips and scenes written to temporary WAV
// files, and helpers for driving the cuewatch binary.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use cuewatch::testgen::{count_cue, go_cue, write_wav, Scenario};
use cuewatch::{AnalyzerBuilder, CueAnalyzer, DetectionConfig, ProfileBuilder, Signal};
use tempfile::TempDir;

pub const RATE: u32 = 22050;

pub fn get_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_cuewatch"))
}

pub fn run_cuewatch<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    Command::new(get_binary_path())
        .args(args)
        .env_remove("CUEWATCH_PROFILE")
        .env_remove("CUEWATCH_COUNT_TEMPLATE")
        .env_remove("CUEWATCH_GO_TEMPLATE")
        .output()
        .expect("Failed to execute cuewatch")
}

/// Configuration the synthetic cues are tuned for
pub fn test_config() -> DetectionConfig {
    ProfileBuilder::new()
        .correlation_threshold(0.35)
        .count_template_duration(1.0)
        .build()
        .expect("valid test config")
}

pub fn test_analyzer() -> CueAnalyzer {
    AnalyzerBuilder::new()
        .config(test_config())
        .build_from_signals(&count_cue().render(RATE), &go_cue().render(RATE))
        .expect("analyzer")
}

/// Template clips padded with silence, as a recording engineer would cut them
pub fn padded_clip(signal: &Signal, pad_seconds: f64) -> Signal {
    let pad = (pad_seconds * signal.sample_rate() as f64) as usize;
    let mut samples = vec![0.0f32; pad];
    samples.extend_from_slice(signal.samples());
    samples.extend(std::iter::repeat(0.0).take(pad));
    Signal::new(samples, signal.sample_rate())
}

/// Temporary directory holding count.wav, go.wav and rendered targets
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        write_wav(dir.path().join("count.wav"), &padded_clip(&count_cue().render(RATE), 0.2))
            .expect("write count template");
        write_wav(dir.path().join("go.wav"), &padded_clip(&go_cue().render(RATE), 0.1))
            .expect("write go template");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn count_template(&self) -> PathBuf {
        self.path().join("count.wav")
    }

    pub fn go_template(&self) -> PathBuf {
        self.path().join("go.wav")
    }

    pub fn write_scenario(&self, file_name: &str, scenario: &Scenario) -> PathBuf {
        let path = self.path().join(file_name);
        write_wav(&path, &scenario.build()).expect("write target");
        path
    }
}
