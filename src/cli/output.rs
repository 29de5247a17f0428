//! Output formatting and progress display

use crate::cli::args::VerbosityLevel;
use crate::core::video::Video;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Output formatter for vidresolve
pub struct OutputFormatter {
    verbosity: VerbosityLevel,
    json: bool,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(verbosity: VerbosityLevel, json: bool) -> Self {
        Self { verbosity, json }
    }

    /// Spinner shown while a decoder talks to the host
    pub fn create_spinner(&self, url: &str) -> Option<ProgressBar> {
        if self.verbosity == VerbosityLevel::Quiet || self.json {
            return None;
        }

        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed}] {msg}")
            .ok()?;

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.set_message(format!("Resolving {}", url));
        spinner.enable_steady_tick(Duration::from_millis(100));
        Some(spinner)
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet && !self.json {
            println!("ℹ️  {}", message);
        }
    }

    /// Print warning message
    pub fn warning(&self, message: &str) {
        if self.verbosity != VerbosityLevel::Quiet {
            eprintln!("⚠️  {}", message);
        }
    }

    /// Print error message
    pub fn error(&self, message: &str) {
        eprintln!("❌ {}", message);
    }

    /// Print resolved videos, one per line or as a JSON array
    pub fn print_videos(&self, videos: &[&Video]) -> Result<(), serde_json::Error> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(videos)?);
            return Ok(());
        }

        for video in videos {
            println!("{}", format_video(video, self.verbosity == VerbosityLevel::Verbose));
        }
        Ok(())
    }

    /// Print registered decoder names in dispatch order
    pub fn print_decoders(&self, names: &[&str]) {
        for (index, name) in names.iter().enumerate() {
            println!("{:>2}. {}", index + 1, name);
        }
    }
}

/// One human-readable line per video; headers on follow-up lines when verbose
fn format_video(video: &Video, with_headers: bool) -> String {
    let mut line = format!("[{:>7}] {:<4} {}", video.quality.to_string(), video.kind, video.url);
    if with_headers {
        for (name, value) in &video.headers {
            line.push_str(&format!("\n           {}: {}", name, value));
        }
    }
    line
}
