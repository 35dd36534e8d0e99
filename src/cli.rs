//! Command-line surface and the wiring from arguments to a finished run.

use anyhow::{Context, Result};
use bridge_desktop::ReqwestHttpClient;
use bridge_traits::{HttpClient, LogLevel};
use clap::{Parser, ValueEnum};
use core_metadata::{
    build_providers, EnrichmentConfig, EnrichmentJob, LoftyTagStore, LookupOrchestrator,
    SummarySnapshot,
};
use core_runtime::config::{
    MetadataApiConfig, RunConfig, DEFAULT_RATE_LIMIT_DELAY_MS, DEFAULT_WORKERS,
};
use core_runtime::logging::{LogFormat, LoggingConfig, DEFAULT_LOG_FILE};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Fill missing genre, year and mood tags on MP3 files.
#[derive(Parser, Debug)]
#[command(name = "track-enricher", version)]
pub struct Args {
    /// Directory scanned recursively for MP3 files.
    pub directory: PathBuf,

    /// Number of files processed concurrently.
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// JSON file with provider credentials (defaults to ./api_keys.json when present).
    #[arg(long)]
    pub api_keys: Option<PathBuf>,

    /// File receiving a plain-text copy of the log.
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Do not write a log file.
    #[arg(long)]
    pub no_log_file: bool,

    /// Minimum level of logged events (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: LogLevel,

    /// Console output format.
    #[arg(long, value_enum, default_value_t = Format::Compact)]
    pub log_format: Format,

    /// Minimum interval between two requests to the same provider, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_RATE_LIMIT_DELAY_MS)]
    pub rate_limit_ms: u64,

    /// Attempts per provider request, the first one included.
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Pretty,
    Compact,
    Json,
}

impl From<Format> for LogFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Pretty => LogFormat::Pretty,
            Format::Compact => LogFormat::Compact,
            Format::Json => LogFormat::Json,
        }
    }
}

impl Args {
    pub fn logging_config(&self) -> LoggingConfig {
        let config = LoggingConfig::default()
            .with_level(self.log_level)
            .with_format(self.log_format.into());

        if self.no_log_file {
            config
        } else {
            config.with_log_file(self.log_file.clone())
        }
    }

    /// Validate the invocation and load credentials.
    ///
    /// # Errors
    ///
    /// Fails when the directory is missing, not a directory or unreadable.
    pub fn run_config(&self) -> Result<RunConfig> {
        let credentials = MetadataApiConfig::from_credentials_file(self.api_keys.as_deref())
            .with_rate_limit_delay_ms(self.rate_limit_ms);

        RunConfig::builder()
            .root(&self.directory)
            .workers(self.workers)
            .metadata_api_config(credentials)
            .build()
            .with_context(|| format!("Cannot process {}", self.directory.display()))
    }

    pub fn enrichment_config(&self, run: &RunConfig) -> EnrichmentConfig {
        let api = &run.metadata_api_config;
        EnrichmentConfig::builder()
            .with_max_concurrent(run.workers)
            .with_max_attempts(self.max_retries)
            .with_rate_limit(Duration::from_millis(api.rate_limit_delay_ms))
            .with_user_agent(api.user_agent.clone())
    }
}

/// Run one batch as described by `args`; logging must already be installed.
pub async fn run(args: &Args) -> Result<SummarySnapshot> {
    let run_config = args.run_config()?;
    let config = args.enrichment_config(&run_config);

    let http_client: Arc<dyn HttpClient> = Arc::new(
        ReqwestHttpClient::with_timeout(&config.user_agent, config.request_timeout)
            .context("Failed to build HTTP client")?,
    );

    let providers = build_providers(
        http_client,
        &run_config.metadata_api_config,
        &config.provider_settings(),
    );
    let orchestrator = Arc::new(LookupOrchestrator::new(providers));

    info!(
        root = %run_config.root.display(),
        workers = run_config.workers,
        "Starting enrichment run"
    );

    let job = EnrichmentJob::new(config, Arc::new(LoftyTagStore::new()), orchestrator);
    Ok(job.run(&run_config.root).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["track-enricher", "/music"]).unwrap();

        assert_eq!(args.directory, PathBuf::from("/music"));
        assert_eq!(args.workers, 4);
        assert_eq!(args.api_keys, None);
        assert_eq!(args.log_file, PathBuf::from("metadata_enrichment.log"));
        assert!(!args.no_log_file);
        assert_eq!(args.log_level, LogLevel::Info);
        assert_eq!(args.log_format, Format::Compact);
        assert_eq!(args.rate_limit_ms, 1000);
        assert_eq!(args.max_retries, 3);
    }

    #[test]
    fn test_flags() {
        let args = Args::try_parse_from([
            "track-enricher",
            "/music",
            "--workers",
            "8",
            "--api-keys",
            "keys.json",
            "--no-log-file",
            "--log-level",
            "debug",
            "--log-format",
            "json",
            "--rate-limit-ms",
            "250",
            "--max-retries",
            "5",
        ])
        .unwrap();

        assert_eq!(args.workers, 8);
        assert_eq!(args.api_keys, Some(PathBuf::from("keys.json")));
        assert_eq!(args.log_level, LogLevel::Debug);
        assert_eq!(args.log_format, Format::Json);

        let logging = args.logging_config();
        assert_eq!(logging.log_file, None);
        assert_eq!(logging.level, LogLevel::Debug);
        assert_eq!(logging.format, LogFormat::Json);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Args::try_parse_from(["track-enricher"]).is_err());
        assert!(Args::try_parse_from(["track-enricher", "/music", "--log-level", "loud"]).is_err());
        assert!(Args::try_parse_from(["track-enricher", "/music", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn test_invalid_root_is_rejected() {
        let args = Args::try_parse_from([
            "track-enricher",
            "/definitely/not/a/music/dir",
            "--api-keys",
            "/definitely/not/keys.json",
        ])
        .unwrap();

        assert!(args.run_config().is_err());
    }

    #[test]
    fn test_enrichment_config_follows_args() {
        let dir = tempfile::tempdir().unwrap();
        let keys = dir.path().join("keys.json");
        std::fs::write(&keys, r#"{"lastfm_api_key": "abc"}"#).unwrap();

        let args = Args::try_parse_from([
            "track-enricher".into(),
            dir.path().as_os_str().to_owned(),
            "--api-keys".into(),
            keys.as_os_str().to_owned(),
            "--workers".into(),
            "0".into(),
            "--rate-limit-ms".into(),
            "50".into(),
            "--max-retries".into(),
            "2".into(),
        ])
        .unwrap();

        let run = args.run_config().unwrap();
        assert_eq!(run.workers, 1);
        assert!(run.metadata_api_config.has_lastfm());
        assert!(!run.metadata_api_config.has_discogs());

        let config = args.enrichment_config(&run);
        assert_eq!(config.max_concurrent, 1);
        assert_eq!(config.rate_limit, Duration::from_millis(50));
        assert_eq!(config.retry.max_attempts, 2);
    }
}
