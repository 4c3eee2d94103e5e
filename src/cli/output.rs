//! Report rendering for the terminal and for exported files

use std::fmt::{Display, Write as _};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colorful::Colorful;

use super::args::OutputFormat;
use crate::config::ProfilePreset;
use crate::detection::{
    ClassOutcome, ConfidenceLevel, DetectionReport, EvaluationSummary, TimingRating,
};

/// `mm:ss.mmm`
pub fn format_timestamp(seconds: f64) -> String {
    let ms = (seconds.max(0.0) * 1000.0).round() as u64;
    format!("{:02}:{:02}.{:03}", ms / 60_000, (ms / 1000) % 60, ms % 1000)
}

/// `MM:SS`, truncated to whole seconds
pub fn format_minutes(seconds: f64) -> String {
    let s = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", s / 60, s % 60)
}

fn paint<D: Display>(text: &str, color: bool, style: impl FnOnce(&str) -> D) -> String {
    if color {
        style(text).to_string()
    } else {
        text.to_string()
    }
}

fn target_name(report: &DetectionReport) -> String {
    report
        .target
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<signal>".to_string())
}

fn class_line(outcome: &ClassOutcome, color: bool) -> String {
    match &outcome.failure {
        Some(failure) => format!(
            "  {:<5} {}",
            outcome.class.label(),
            paint(&format!("✗ {}", failure), color, |s| s.red())
        ),
        None => {
            let band = outcome
                .band
                .map(|b| format!(", band {:.0}-{:.0} Hz", b.low_hz, b.high_hz))
                .unwrap_or_default();
            format!(
                "  {:<5} {} candidates from {} peaks (template {:.3} s{})",
                outcome.class.label(),
                outcome.candidates.len(),
                outcome.raw_peaks,
                outcome.template_seconds.unwrap_or(0.0),
                band
            )
        }
    }
}

/// Terminal table. `color` adds ANSI styling.
pub fn render_text(report: &DetectionReport, verbose: bool, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({:.1} s, {} Hz) [{}]",
        paint(&target_name(report), color, |s| s.cyan().bold()),
        report.target.duration_seconds,
        report.target.sample_rate,
        report.config.preset
    );
    let _ = writeln!(out, "{}", class_line(&report.count, color));
    let _ = writeln!(out, "{}", class_line(&report.go, color));

    if report.patterns.is_empty() {
        let _ = writeln!(out, "  {}", paint("No count→go patterns found", color, |s| s.yellow()));
    } else {
        let _ = writeln!(
            out,
            "\n  {:>4}  {:<10}  {:<10}  {:>7}  {:>10}",
            "No.", "Count", "Go", "Gap", "Confidence"
        );
        for sp in &report.patterns {
            let p = &sp.pattern;
            let level = ConfidenceLevel::from_confidence(p.confidence);
            let marker = match level {
                ConfidenceLevel::High => paint(level.symbol(), color, |s| s.green()),
                ConfidenceLevel::Medium => paint(level.symbol(), color, |s| s.yellow()),
                ConfidenceLevel::Low => paint(level.symbol(), color, |s| s.red()),
            };
            let _ = writeln!(
                out,
                "  {:>4}  {:<10}  {:<10}  {:>6.2}s  {:>9.1}% {}",
                sp.sequence,
                format_timestamp(p.count.time_offset),
                format_timestamp(p.go.time_offset),
                p.gap_seconds,
                p.confidence * 100.0,
                marker
            );
            if verbose {
                let _ = writeln!(
                    out,
                    "        count corr {:.3} spec {:.3} | go corr {:.3} spec {:.3}",
                    p.count.correlation_score,
                    p.count.spectral_score,
                    p.go.correlation_score,
                    p.go.spectral_score
                );
            }
        }
    }

    let stats = &report.statistics;
    if let Some(gaps) = &stats.gaps {
        let _ = writeln!(
            out,
            "\n  Gaps: mean {:.2} s, range {:.2}-{:.2} s{}",
            gaps.mean,
            gaps.min,
            gaps.max,
            stats
                .consistency
                .map(|c| format!(" ({})", c))
                .unwrap_or_default()
        );
    }
    if let Some(intervals) = &stats.intervals {
        let _ = writeln!(
            out,
            "  Intervals: mean {:.1} s, range {:.1}-{:.1} s",
            intervals.mean, intervals.min, intervals.max
        );
    }

    if verbose {
        for outcome in [&report.count, &report.go] {
            for c in &outcome.candidates {
                let _ = writeln!(
                    out,
                    "  {} {}  corr {:.3}  spec {:.3}  conf {:.3}",
                    outcome.class.label(),
                    format_timestamp(c.time_offset),
                    c.correlation_score,
                    c.spectral_score,
                    c.confidence
                );
            }
        }
        let _ = writeln!(out, "  Processed in {:.2} s", report.elapsed_seconds);
    }

    if let Some(evaluation) = &report.evaluation {
        out.push_str(&render_evaluation(evaluation, color));
    }

    out
}

fn render_evaluation(summary: &EvaluationSummary, color: bool) -> String {
    let mut out = String::new();
    let headline = format!(
        "Evaluation: {} hit, {} missed, {} false alarm (P {:.2} R {:.2} F1 {:.2})",
        summary.hits(),
        summary.missed.len(),
        summary.false_alarms.len(),
        summary.precision,
        summary.recall,
        summary.f1
    );
    let headline = if summary.is_perfect() {
        paint(&headline, color, |s| s.green())
    } else {
        paint(&headline, color, |s| s.yellow())
    };
    let _ = writeln!(out, "\n  {}", headline);

    for m in &summary.matches {
        let _ = writeln!(
            out,
            "    expected {} detected {} ({:+.0} ms, {:?})",
            format_timestamp(m.expected),
            format_timestamp(m.detected),
            m.error_seconds * 1000.0,
            m.rating
        );
    }
    for t in &summary.missed {
        let _ = writeln!(out, "    missed {}", format_timestamp(*t));
    }
    for t in &summary.false_alarms {
        let _ = writeln!(out, "    false alarm {}", format_timestamp(*t));
    }
    if let Some(mae) = summary.mean_abs_error_seconds {
        let _ = writeln!(
            out,
            "    mean timing error {:.1} ms ({:?})",
            mae * 1000.0,
            TimingRating::from_error(mae)
        );
    }
    out
}

pub fn render_csv(report: &DetectionReport) -> String {
    let mut out = String::from("Sequence_Number,Count_Time_MS,Go_Time_MS,Gap_Seconds,Confidence,Timestamp\n");
    for sp in &report.patterns {
        let p = &sp.pattern;
        let _ = writeln!(
            out,
            "{},{},{},{:.3},{:.3},{}",
            sp.sequence,
            (p.count.time_offset * 1000.0).round() as u64,
            (p.go.time_offset * 1000.0).round() as u64,
            p.gap_seconds,
            p.confidence,
            format_minutes(p.count.time_offset)
        );
    }
    out
}

pub fn render_json(report: &DetectionReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report")
}

pub fn render_markdown(report: &DetectionReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Cue patterns: {}\n", target_name(report));
    let _ = writeln!(out, "- Generated: {}", report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out, "- Duration: {:.1} s at {} Hz", report.target.duration_seconds, report.target.sample_rate);
    let _ = writeln!(out, "- Profile: {}", report.config.preset);
    let _ = writeln!(out, "- Count candidates: {}", report.count.candidates.len());
    let _ = writeln!(out, "- Go candidates: {}", report.go.candidates.len());
    let _ = writeln!(out, "- Patterns: {}", report.patterns.len());
    if let (Some(gaps), Some(consistency)) = (&report.statistics.gaps, report.statistics.consistency) {
        let _ = writeln!(
            out,
            "- Gap: mean {:.2} s, range {:.2}-{:.2} s ({})",
            gaps.mean, gaps.min, gaps.max, consistency
        );
    }
    for (class, failure) in report.failures() {
        let _ = writeln!(out, "- **{} failed**: {}", class, failure);
    }

    for sp in &report.patterns {
        let p = &sp.pattern;
        let _ = writeln!(out, "\n## Pattern {}\n", sp.sequence);
        let _ = writeln!(out, "| | Time | Correlation | Spectral | Confidence |");
        let _ = writeln!(out, "|---|---|---|---|---|");
        for (label, c) in [("Count", &p.count), ("Go", &p.go)] {
            let _ = writeln!(
                out,
                "| {} | {} | {:.3} | {:.3} | {:.3} |",
                label,
                format_timestamp(c.time_offset),
                c.correlation_score,
                c.spectral_score,
                c.confidence
            );
        }
        let _ = writeln!(
            out,
            "\nGap {:.3} s, pattern confidence {:.3} ({:?})",
            p.gap_seconds,
            p.confidence,
            ConfidenceLevel::from_confidence(p.confidence)
        );
    }

    if let Some(evaluation) = &report.evaluation {
        let _ = writeln!(out, "\n## Evaluation\n");
        let _ = writeln!(
            out,
            "{} of {} expected found, {} false alarms, F1 {:.3}",
            evaluation.hits(),
            evaluation.hits() + evaluation.missed.len(),
            evaluation.false_alarms.len(),
            evaluation.f1
        );
    }
    out
}

/// Render without terminal colour
pub fn render(report: &DetectionReport, format: OutputFormat, verbose: bool) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => render_text(report, verbose, false),
        OutputFormat::Csv => render_csv(report),
        OutputFormat::Json => render_json(report)?,
        OutputFormat::Markdown => render_markdown(report),
    })
}

/// `<dir>/<stem>_patterns.<ext>`
pub fn report_path(dir: &Path, report: &DetectionReport, format: OutputFormat) -> PathBuf {
    let stem = report
        .target
        .path
        .as_ref()
        .and_then(|p| p.file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "signal".to_string());
    dir.join(format!("{}_patterns.{}", stem, format.extension()))
}

pub fn write_report(
    dir: &Path,
    report: &DetectionReport,
    format: OutputFormat,
    verbose: bool,
) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = report_path(dir, report, format);
    fs::write(&path, render(report, format, verbose)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

pub fn print_profiles() {
    println!("{}", "Available profiles:".bold());
    for preset in ProfilePreset::all() {
        println!("  {:<16} {}", preset.name().cyan(), preset.description());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionConfig;
    use crate::detection::{Candidate, CueClass, Pattern, StageFailure, TargetInfo};

    fn candidate(t: f64) -> Candidate {
        Candidate::new(t, 0.81, 0.64, 0.5)
    }

    fn outcome(class: CueClass) -> ClassOutcome {
        ClassOutcome {
            class,
            candidates: Vec::new(),
            raw_peaks: 0,
            template_seconds: Some(0.5),
            band: None,
            failure: None,
        }
    }

    fn report() -> DetectionReport {
        DetectionReport::new(
            TargetInfo {
                path: Some(PathBuf::from("/rec/show one.wav")),
                duration_seconds: 120.0,
                sample_rate: 44100,
            },
            outcome(CueClass::Count),
            ClassOutcome::failed(
                CueClass::Go,
                StageFailure::RateMismatch {
                    template: 22050,
                    target: 44100,
                },
            ),
            vec![
                Pattern::new(candidate(10.0), candidate(14.2)),
                Pattern::new(candidate(75.5), candidate(80.0)),
            ],
            DetectionConfig::default(),
            1.25,
        )
    }

    #[test]
    fn test_timestamps() {
        assert_eq!(format_timestamp(0.0), "00:00.000");
        assert_eq!(format_timestamp(75.5), "01:15.500");
        assert_eq!(format_timestamp(3599.9994), "59:59.999");
        assert_eq!(format_minutes(75.9), "01:15");
    }

    #[test]
    fn test_csv() {
        let csv = render_csv(&report());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Sequence_Number,Count_Time_MS,Go_Time_MS,Gap_Seconds,Confidence,Timestamp");
        assert_eq!(lines[1], "1,10000,14200,4.200,0.720,00:10");
        assert_eq!(lines[2], "2,75500,80000,4.500,0.720,01:15");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_text_without_color() {
        let text = render_text(&report(), false, false);
        assert!(text.contains("show one.wav"));
        assert!(text.contains("00:14.200"));
        assert!(text.contains("does not match"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn test_markdown_sections() {
        let md = render_markdown(&report());
        assert!(md.contains("## Pattern 1"));
        assert!(md.contains("## Pattern 2"));
        assert!(md.contains("go failed"));
    }

    #[test]
    fn test_json_roundtrips() {
        let json = render_json(&report()).unwrap();
        let back: DetectionReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.patterns.len(), 2);
        assert_eq!(back.go.failure, report().go.failure);
    }

    #[test]
    fn test_write_report_naming() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_report(dir.path(), &report(), OutputFormat::Csv, false).unwrap();
        assert_eq!(path.file_name().unwrap(), "show one_patterns.csv");
        assert!(fs::read_to_string(path).unwrap().starts_with("Sequence_Number"));
    }
}
