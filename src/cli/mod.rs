// src/cli/mod.rs
//
// Command-line interface: argument parsing, file discovery, batch run and
// report output.

mod args;
mod output;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colorful::Colorful;
use indicatif::{ProgressBar, ProgressStyle};
use walkdir::WalkDir;

use crate::core::decoder::is_audio_file;
use crate::core::{AnalyzerBuilder, CueAnalyzer};

pub use args::{Args, MethodArg, OutputFormat, SpectralArg};
pub use output::{
    format_minutes, format_timestamp, print_profiles, render, render_csv, render_json,
    render_markdown, render_text, report_path, write_report,
};

/// Audio files under the given paths. Files named explicitly are kept
/// whatever their extension; directories are walked for known extensions.
pub fn collect_audio_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_audio_file(e.path()))
                .map(|e| e.into_path())
                .collect();
            found.sort();
            files.extend(found);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            log::warn!("{} does not exist, skipping", path.display());
        }
    }
    files
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    if len < 2 {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );
    Ok(pb)
}

/// Run the CLI. Errors are configuration or setup failures; a target that
/// cannot be decoded is reported and skipped.
pub fn run(args: &Args) -> Result<()> {
    if args.list_profiles {
        print_profiles();
        return Ok(());
    }

    if let Some(path) = args.config_path() {
        log::info!("Using configuration {}", path.display());
    }
    let config = args.detection_config().context("Invalid configuration")?;
    if let Some(path) = &args.save_config {
        config
            .save_json(path)
            .with_context(|| format!("Failed to save configuration to {}", path.display()))?;
        log::info!("Configuration written to {}", path.display());
    }

    let (count, go) = match (&args.count_template, &args.go_template) {
        (Some(c), Some(g)) => (c, g),
        _ => anyhow::bail!("Both --count-template and --go-template are required"),
    };
    let analyzer = AnalyzerBuilder::new().config(config).build(count, go)?;

    let files = collect_audio_files(&args.targets);
    if files.is_empty() {
        println!("{}", "No audio files found!".red());
        return Ok(());
    }
    log::info!("Found {} audio file(s)", files.len());

    let pb = progress_bar(files.len())?;
    let mut failed = 0usize;
    for file in &files {
        pb.set_message(
            file.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        if let Err(e) = process_file(&analyzer, file, args, &pb) {
            failed += 1;
            pb.suspend(|| eprintln!("{} {}: {:#}", "✗".red(), file.display(), e));
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if failed > 0 {
        log::warn!("{} of {} file(s) could not be analyzed", failed, files.len());
    }
    Ok(())
}

fn process_file(analyzer: &CueAnalyzer, file: &Path, args: &Args, pb: &ProgressBar) -> Result<()> {
    let mut report = analyzer.analyze_file(file)?;
    if !args.expect.is_empty() {
        report.evaluate_against(&args.expect, args.tolerance);
    }

    let rendered = match args.format {
        OutputFormat::Text => render_text(&report, args.verbose, true),
        format => render(&report, format, args.verbose)?,
    };
    pb.suspend(|| println!("{}", rendered));

    if let Some(dir) = &args.output {
        let path = write_report(dir, &report, args.format, args.verbose)?;
        log::info!("Report saved to {}", path.display());
    }
    Ok(())
}
