// src/core/analysis/correlation.rs
//
// Normalized cross-correlation of a template against long targets, with
// coarse peak picking and sub-sample refinement

use rayon::prelude::*;
use realfft::RealFftPlanner;

use crate::config::CorrelationMethod;
use crate::core::dsp::{find_peaks, parabolic_vertex, PeakCriteria};

/// Offsets scored per parallel task by the direct method
const DIRECT_BLOCK: usize = 4096;
/// Template length × offsets up to which `Auto` correlates directly
const DIRECT_WORK_LIMIT: usize = 4_000_000;
const MIN_FFT_SIZE: usize = 4096;
/// Windows whose variance is below this (per sample) score 0
const ENERGY_FLOOR: f64 = 1e-12;

/// Clipped Pearson correlation for every template placement
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationCurve {
    scores: Vec<f32>,
    sample_rate: u32,
}

impl CorrelationCurve {
    pub fn new(scores: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            scores,
            sample_rate,
        }
    }

    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Highest score and its offset
    pub fn max(&self) -> Option<(usize, f64)> {
        self.scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1).then(b.0.cmp(&a.0)))
            .map(|(i, &s)| (i, s as f64))
    }

    /// Peaks scoring strictly above `search.threshold`, in offset order.
    ///
    /// Refinement runs as the iterator is consumed.
    pub fn peaks(&self, search: &PeakSearch) -> Peaks<'_> {
        let criteria = PeakCriteria {
            min_height: search.threshold,
            min_distance: search.separation_samples.max(1),
            min_prominence: search.min_prominence,
            prominence_window: search.prominence_window,
        };
        let indices: Vec<usize> = find_peaks(&self.scores, &criteria)
            .into_iter()
            .filter(|&i| self.scores[i] as f64 > search.threshold)
            .collect();

        Peaks {
            curve: self,
            indices: indices.into_iter(),
            lobe_radius: search.lobe_radius,
        }
    }

    /// Parabolic refinement through the neighbours of `index`; the integer
    /// position is kept at the curve edges and on flat curvature.
    pub fn refine(&self, index: usize) -> f64 {
        self.vertex(index).0
    }

    /// Sub-sample position and crest height of the main lobe near `index`.
    ///
    /// A tonal template correlates as a comb of lobes one period apart,
    /// and their crests trace the correlation envelope. The integer sample
    /// grid can make a side lobe's best sample the tallest one, so every
    /// local maximum within `radius` samples is refined and the highest
    /// crest wins, ties going to the earlier lobe.
    pub fn refine_lobe(&self, index: usize, radius: usize) -> (f64, f64) {
        let mut best = self.vertex(index);
        if radius == 0 || self.scores.len() < 3 {
            return best;
        }

        let lo = index.saturating_sub(radius).max(1);
        let hi = (index + radius).min(self.scores.len() - 2);
        for k in lo..=hi {
            let y = self.scores[k];
            if k == index || !(self.scores[k - 1] < y && y >= self.scores[k + 1]) {
                continue;
            }
            let crest = self.vertex(k);
            if crest.1 > best.1 || (crest.1 == best.1 && crest.0 < best.0) {
                best = crest;
            }
        }
        best
    }

    fn vertex(&self, index: usize) -> (f64, f64) {
        let y2 = self.scores[index] as f64;
        if index == 0 || index + 1 >= self.scores.len() {
            return (index as f64, y2);
        }
        let y1 = self.scores[index - 1] as f64;
        let y3 = self.scores[index + 1] as f64;
        match parabolic_vertex(y1, y2, y3) {
            Some((offset, height)) => (index as f64 + offset, height.max(y2)),
            None => (index as f64, y2),
        }
    }
}

/// Coarse peak-picking parameters for a correlation curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakSearch {
    /// Scores must exceed this
    pub threshold: f64,
    pub separation_samples: usize,
    pub min_prominence: f64,
    /// Prominence search window in samples (0 = whole curve)
    pub prominence_window: usize,
    /// Samples either side of a peak searched for the main lobe's crest
    /// (0 = refine in place)
    pub lobe_radius: usize,
}

/// A correlation peak above threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPeak {
    /// Offset of the coarse local maximum
    pub index: usize,
    /// Sub-sample offset of the main lobe's crest
    pub refined_index: f64,
    /// Interpolated crest height, never below the coarse sample's score
    pub score: f64,
}

impl RawPeak {
    pub fn time_seconds(&self, sample_rate: u32) -> f64 {
        (self.refined_index / sample_rate as f64).max(0.0)
    }
}

/// Lazy sequence of refined peaks
pub struct Peaks<'c> {
    curve: &'c CorrelationCurve,
    indices: std::vec::IntoIter<usize>,
    lobe_radius: usize,
}

impl Iterator for Peaks<'_> {
    type Item = RawPeak;

    fn next(&mut self) -> Option<RawPeak> {
        let index = self.indices.next()?;
        let (refined_index, crest) = self.curve.refine_lobe(index, self.lobe_radius);
        Some(RawPeak {
            index,
            refined_index,
            score: crest.min(1.0),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.indices.size_hint()
    }
}

impl ExactSizeIterator for Peaks<'_> {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Path {
    Direct,
    Fft,
}

/// Slides a zero-mean template over target signals
#[derive(Debug, Clone)]
pub struct Correlator {
    template: Vec<f64>,
    norm: f64,
}

impl Correlator {
    pub fn new(template: &[f32]) -> Self {
        let m = template.len();
        let mean = if m == 0 {
            0.0
        } else {
            template.iter().map(|&s| s as f64).sum::<f64>() / m as f64
        };
        let template: Vec<f64> = template.iter().map(|&s| s as f64 - mean).collect();
        let norm = template.iter().map(|t| t * t).sum::<f64>().sqrt();
        Self { template, norm }
    }

    pub fn template_len(&self) -> usize {
        self.template.len()
    }

    /// One score per offset `0..=target.len() - template_len`; empty when
    /// the target is shorter than the template.
    pub fn correlate(&self, target: &[f32], sample_rate: u32, method: CorrelationMethod) -> CorrelationCurve {
        let m = self.template.len();
        if m == 0 || target.len() < m {
            return CorrelationCurve::new(Vec::new(), sample_rate);
        }

        let scores = match self.path(method, target.len() - m + 1) {
            Path::Direct => self.direct(target),
            Path::Fft => self.fft(target),
        };
        CorrelationCurve::new(scores, sample_rate)
    }

    fn path(&self, method: CorrelationMethod, outputs: usize) -> Path {
        match method {
            CorrelationMethod::Direct => Path::Direct,
            CorrelationMethod::Fft => Path::Fft,
            CorrelationMethod::Auto => {
                if self.template.len().saturating_mul(outputs) <= DIRECT_WORK_LIMIT {
                    Path::Direct
                } else {
                    Path::Fft
                }
            }
        }
    }

    fn direct(&self, target: &[f32]) -> Vec<f32> {
        let m = self.template.len();
        let outputs = target.len() - m + 1;
        let mut scores = vec![0.0f32; outputs];

        scores
            .par_chunks_mut(DIRECT_BLOCK)
            .enumerate()
            .for_each(|(block, out)| {
                let start = block * DIRECT_BLOCK;
                let dots: Vec<f64> = (start..start + out.len())
                    .map(|k| {
                        self.template
                            .iter()
                            .zip(&target[k..k + m])
                            .map(|(&t, &x)| t * x as f64)
                            .sum()
                    })
                    .collect();
                self.normalize_block(target, start, &dots, out);
            });

        scores
    }

    /// Overlap-save: each block of `size` samples yields `size - m + 1`
    /// valid lags of the circular correlation.
    fn fft(&self, target: &[f32]) -> Vec<f32> {
        let m = self.template.len();
        let outputs = target.len() - m + 1;
        let size = (4 * m).max(MIN_FFT_SIZE).next_power_of_two();
        let step = size - m + 1;

        let mut planner = RealFftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);

        let mut template_in = forward.make_input_vec();
        template_in[..m].copy_from_slice(&self.template);
        let mut template_spectrum = forward.make_output_vec();
        // Buffers come from the plans, so lengths always match
        if forward.process(&mut template_in, &mut template_spectrum).is_err() {
            return self.direct(target);
        }
        template_spectrum.iter_mut().for_each(|c| *c = c.conj());

        let scale = 1.0 / size as f64;
        let last_bin = template_spectrum.len() - 1;
        let mut scores = vec![0.0f32; outputs];

        scores.par_chunks_mut(step).enumerate().for_each_init(
            || {
                (
                    forward.make_input_vec(),
                    forward.make_output_vec(),
                    inverse.make_output_vec(),
                    Vec::with_capacity(step),
                )
            },
            |(input, spectrum, lags, dots), (block, out)| {
                let start = block * step;
                let available = (target.len() - start).min(size);
                for (slot, &x) in input.iter_mut().zip(&target[start..start + available]) {
                    *slot = x as f64;
                }
                input[available..].fill(0.0);

                if forward.process(input, spectrum).is_err() {
                    return;
                }
                for (s, t) in spectrum.iter_mut().zip(&template_spectrum) {
                    *s *= t;
                }
                spectrum[0].im = 0.0;
                spectrum[last_bin].im = 0.0;
                if inverse.process(spectrum, lags).is_err() {
                    return;
                }

                dots.clear();
                dots.extend(lags[..out.len()].iter().map(|&v| v * scale));
                self.normalize_block(target, start, dots, out);
            },
        );

        scores
    }

    /// Turn raw dot products for offsets `start..start + dots.len()` into
    /// clipped Pearson scores. Window sums slide within the block and are
    /// recomputed at each block start.
    fn normalize_block(&self, target: &[f32], start: usize, dots: &[f64], out: &mut [f32]) {
        let m = self.template.len();
        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        for &x in &target[start..start + m] {
            let x = x as f64;
            sum += x;
            sum_sq += x * x;
        }

        for (k, (&dot, score)) in dots.iter().zip(out.iter_mut()).enumerate() {
            if k > 0 {
                let old = target[start + k - 1] as f64;
                let new = target[start + k + m - 1] as f64;
                sum += new - old;
                sum_sq += new * new - old * old;
            }
            let variance = sum_sq - sum * sum / m as f64;
            *score = self.score(dot, variance);
        }
    }

    fn score(&self, dot: f64, variance: f64) -> f32 {
        if variance <= ENERGY_FLOOR * self.template.len() as f64 || self.norm <= 0.0 {
            return 0.0;
        }
        let r = dot / (variance.sqrt() * self.norm);
        if r.is_finite() {
            r.clamp(0.0, 1.0) as f32
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn chirp(len: usize, rate: u32) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f64 / rate as f64;
                let f = 800.0 + 2000.0 * t;
                (0.5 * (2.0 * PI * f * t).sin()) as f32
            })
            .collect()
    }

    fn noise(len: usize, seed: u64) -> Vec<f32> {
        // Small LCG so the test has no extra dependencies
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 33) as f64 / (1u64 << 31) as f64 - 0.5) as f32 * 0.2
            })
            .collect()
    }

    fn embed(target: &mut [f32], template: &[f32], at: usize) {
        for (t, &s) in target[at..].iter_mut().zip(template) {
            *t += s;
        }
    }

    #[test]
    fn test_exact_match_scores_one() {
        let rate = 8000;
        let template = chirp(400, rate);
        let mut target = noise(4000, 1);
        target[1200..1600].copy_from_slice(&template);

        let curve = Correlator::new(&template).correlate(&target, rate, CorrelationMethod::Direct);
        assert_eq!(curve.len(), 4000 - 400 + 1);
        let (index, score) = curve.max().unwrap();
        assert_eq!(index, 1200);
        assert!((score - 1.0).abs() < 1e-5);
        assert!(curve.scores().iter().all(|&s| (0.0..=1.0).contains(&s)));
    }

    #[test]
    fn test_direct_and_fft_agree() {
        let rate = 8000;
        let template = chirp(300, rate);
        let mut target = noise(20000, 7);
        embed(&mut target, &template, 5000);
        embed(&mut target, &template, 14321);

        let correlator = Correlator::new(&template);
        let direct = correlator.correlate(&target, rate, CorrelationMethod::Direct);
        let fft = correlator.correlate(&target, rate, CorrelationMethod::Fft);

        assert_eq!(direct.len(), fft.len());
        for (a, b) in direct.scores().iter().zip(fft.scores()) {
            assert!((a - b).abs() < 1e-4, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_target_shorter_than_template() {
        let template = chirp(400, 8000);
        let curve = Correlator::new(&template).correlate(&template[..399], 8000, CorrelationMethod::Auto);
        assert!(curve.is_empty());
        let search = PeakSearch {
            threshold: 0.0,
            separation_samples: 1,
            min_prominence: 0.0,
            prominence_window: 0,
            lobe_radius: 0,
        };
        assert_eq!(curve.peaks(&search).count(), 0);
    }

    #[test]
    fn test_silent_windows_score_zero() {
        let template = chirp(100, 8000);
        let target = vec![0.0f32; 1000];
        for method in [CorrelationMethod::Direct, CorrelationMethod::Fft] {
            let curve = Correlator::new(&template).correlate(&target, 8000, method);
            assert!(curve.scores().iter().all(|&s| s == 0.0));
        }
    }

    #[test]
    fn test_peaks_above_threshold_only() {
        let rate = 8000;
        let template = chirp(300, rate);
        let mut target = noise(12000, 3);
        embed(&mut target, &template, 2000);
        embed(&mut target, &template, 9000);

        let curve = Correlator::new(&template).correlate(&target, rate, CorrelationMethod::Auto);
        let search = PeakSearch {
            threshold: 0.5,
            separation_samples: 400,
            min_prominence: 0.02,
            prominence_window: 601,
            lobe_radius: 200,
        };
        let peaks: Vec<RawPeak> = curve.peaks(&search).collect();
        assert_eq!(peaks.len(), 2);
        assert_eq!(peaks[0].index, 2000);
        assert_eq!(peaks[1].index, 9000);
        assert!(peaks.iter().all(|p| p.score > 0.5));
        assert!(peaks.iter().all(|p| (p.refined_index - p.index as f64).abs() <= 0.5));
    }

    #[test]
    fn test_refine_at_edges() {
        let curve = CorrelationCurve::new(vec![0.9, 0.5, 0.2, 0.4, 0.8], 1000);
        assert_eq!(curve.refine(0), 0.0);
        assert_eq!(curve.refine(4), 4.0);

        let curve = CorrelationCurve::new(vec![0.5, 0.5, 0.5], 1000);
        assert_eq!(curve.refine(1), 1.0);
        assert_eq!(curve.refine_lobe(1, 10), (1.0, 0.5));
    }

    /// Lobes of a 880 Hz tone at 22.05 kHz under a slowly decaying envelope,
    /// with the true crest halfway between two samples
    fn tonal_curve(center: f64) -> CorrelationCurve {
        let period = 22050.0 / 880.0;
        let scores = (0..1000)
            .map(|k| {
                let lag = k as f64 - center;
                ((1.0 - 1.43e-7 * lag * lag) * (2.0 * PI * lag / period).cos()).max(0.0) as f32
            })
            .collect();
        CorrelationCurve::new(scores, 22050)
    }

    #[test]
    fn test_refine_lobe_picks_envelope_crest() {
        let curve = tonal_curve(500.5);
        // The tallest sample sits on a side lobe, whole periods away
        let (coarse, _) = curve.max().unwrap();
        assert!((coarse as f64 - 500.5).abs() > 20.0, "coarse {}", coarse);
        assert!((curve.refine(coarse) - 500.5).abs() > 20.0);

        let (position, crest) = curve.refine_lobe(coarse, 300);
        assert!((position - 500.5).abs() < 0.05, "position {}", position);
        assert!(crest >= curve.scores()[coarse] as f64);
        assert!(crest <= 1.0 + 1e-6);
    }

    #[test]
    fn test_peaks_report_main_lobe() {
        let curve = tonal_curve(500.5);
        let search = PeakSearch {
            threshold: 0.5,
            separation_samples: 1000,
            min_prominence: 0.0,
            prominence_window: 0,
            lobe_radius: 300,
        };
        let peaks: Vec<RawPeak> = curve.peaks(&search).collect();
        assert_eq!(peaks.len(), 1);
        assert!((peaks[0].refined_index - 500.5).abs() < 0.05);
        assert!(peaks[0].score > 0.5);
        assert!((peaks[0].time_seconds(22050) - 500.5 / 22050.0).abs() < 1e-5);
    }
}
