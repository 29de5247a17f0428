//! Command line argument parsing

use crate::core::video::QualitySelector;
use crate::platform::client::HttpClientConfig;
use clap::Parser;
use std::time::Duration;

/// Resolve a video-host embed page to directly playable media links
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Embed page URL (Kodik, Aniboom, Sibnet, CSST, Mp4upload, Filemoon, Uppod)
    #[arg(required_unless_present = "list_decoders")]
    pub url: Option<String>,

    /// Quality selector (e.g., 'best', 'worst', '720', '<=480', '>=720')
    #[arg(long, value_name = "QUALITY")]
    pub quality: Option<String>,

    /// Print videos as JSON records
    #[arg(long)]
    pub json: bool,

    /// Resolve through the blocking client instead of the async one
    #[arg(long)]
    pub blocking: bool,

    /// HTTP timeout (e.g., 30s, 1m)
    #[arg(long, value_name = "DURATION", default_value = "30s")]
    pub timeout: humantime::Duration,

    /// Override User-Agent header
    #[arg(long, value_name = "USER_AGENT")]
    pub user_agent: Option<String>,

    /// Proxy URL (http/https/socks)
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// List registered decoders and exit
    #[arg(long)]
    pub list_decoders: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (only errors)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Get HTTP timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        self.timeout.into()
    }

    /// Parsed `--quality`, if given
    pub fn quality_selector(&self) -> Result<Option<QualitySelector>, String> {
        self.quality
            .as_deref()
            .map(QualitySelector::from_str)
            .transpose()
    }

    /// HTTP settings from the command line
    pub fn http_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout: self.timeout_duration(),
            user_agent: self.user_agent.clone(),
            proxy_url: self.proxy.clone(),
            ..HttpClientConfig::default()
        }
    }

    /// Get output verbosity level
    pub fn verbosity_level(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbosityLevel {
    /// Quiet (only errors)
    Quiet,
    /// Normal
    Normal,
    /// Verbose (debug info)
    Verbose,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            url: None,
            quality: None,
            json: false,
            blocking: false,
            timeout: humantime::Duration::from(Duration::from_secs(30)),
            user_agent: None,
            proxy: None,
            list_decoders: false,
            verbose: false,
            quiet: false,
        }
    }
}
