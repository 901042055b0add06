//! `sync` and `watch` command implementations.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::{info, warn};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use pcidb_core::{AggregateStore, HashMode, SqliteAggregateStore, ValidationPolicy};
use pcidb_data::source::{DEFAULT_REGISTRY_URL, DEFAULT_USER_AGENT};
use pcidb_data::{
    FileRegistrySource, HttpRegistrySource, PipelineError, PipelineOptions, RegistrySource,
    RunReport, SourceUrl, run_pipeline,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{
    ARG_DATABASE, ARG_HASH_MODE, ARG_INTERVAL_SECS, ARG_SOURCE_FILE, ARG_SOURCE_URL,
    ARG_TIMEOUT_SECS, ARG_USER_AGENT, ARG_VALIDATION, CliError, ENV_SYNC_DATABASE,
    ENV_WATCH_DATABASE,
};

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_INTERVAL_SECS: u64 = 86_400;

/// CLI arguments for the `sync` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Fetch the registry, skip the run when its version is \
                 already stored, and otherwise reconcile every vendor and \
                 class into the SQLite database. Options can come from CLI \
                 flags, configuration files, or environment variables.",
    about = "Run one ingestion pass"
)]
#[ortho_config(prefix = "PCIDB")]
pub(crate) struct SyncArgs {
    /// Path to the SQLite aggregate database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Registry URL (defaults to the upstream pci.ids).
    #[arg(long = ARG_SOURCE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) source_url: Option<String>,
    /// Read the registry from a local file instead of downloading it.
    #[arg(long = ARG_SOURCE_FILE, value_name = "path")]
    #[serde(default)]
    pub(crate) source_file: Option<Utf8PathBuf>,
    /// User agent sent with HTTP requests.
    #[arg(long = ARG_USER_AGENT, value_name = "agent")]
    #[serde(default)]
    pub(crate) user_agent: Option<String>,
    /// Whole-request timeout for downloads, in seconds.
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "seconds")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    /// `strict` rejects malformed registries; `lenient` drops bad entries.
    #[arg(long = ARG_VALIDATION, value_name = "policy")]
    #[serde(default)]
    pub(crate) validation: Option<ValidationPolicy>,
    /// `compatible` or `corrected` content hashing.
    #[arg(long = ARG_HASH_MODE, value_name = "mode")]
    #[serde(default)]
    pub(crate) hash_mode: Option<HashMode>,
}

impl SyncArgs {
    pub(crate) fn into_config(self) -> Result<SyncConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        SyncConfig::try_from(merged)
    }
}

/// CLI arguments for the `watch` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Run an ingestion pass, wait for the interval, and repeat \
                 until interrupted with Ctrl-C. Failed passes are logged and \
                 retried at the next interval.",
    about = "Run ingestion passes on a fixed interval"
)]
#[ortho_config(prefix = "PCIDB")]
pub(crate) struct WatchArgs {
    /// Path to the SQLite aggregate database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Registry URL (defaults to the upstream pci.ids).
    #[arg(long = ARG_SOURCE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) source_url: Option<String>,
    /// Read the registry from a local file instead of downloading it.
    #[arg(long = ARG_SOURCE_FILE, value_name = "path")]
    #[serde(default)]
    pub(crate) source_file: Option<Utf8PathBuf>,
    /// User agent sent with HTTP requests.
    #[arg(long = ARG_USER_AGENT, value_name = "agent")]
    #[serde(default)]
    pub(crate) user_agent: Option<String>,
    /// Whole-request timeout for downloads, in seconds.
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "seconds")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    /// `strict` rejects malformed registries; `lenient` drops bad entries.
    #[arg(long = ARG_VALIDATION, value_name = "policy")]
    #[serde(default)]
    pub(crate) validation: Option<ValidationPolicy>,
    /// `compatible` or `corrected` content hashing.
    #[arg(long = ARG_HASH_MODE, value_name = "mode")]
    #[serde(default)]
    pub(crate) hash_mode: Option<HashMode>,
    /// Seconds to wait after each pass before the next (default: one day).
    #[arg(long = ARG_INTERVAL_SECS, value_name = "seconds")]
    #[serde(default)]
    pub(crate) interval_secs: Option<u64>,
}

impl WatchArgs {
    pub(crate) fn into_config(self) -> Result<WatchConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        WatchConfig::try_from(merged)
    }
}

/// Where the registry text is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SourceChoice {
    Http(SourceUrl),
    File(Utf8PathBuf),
}

/// Resolved `sync` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyncConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) source: SourceChoice,
    pub(crate) user_agent: String,
    pub(crate) timeout: Duration,
    pub(crate) options: PipelineOptions,
}

impl SyncConfig {
    fn resolve(args: SyncArgs, database_env: &'static str) -> Result<Self, CliError> {
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: database_env,
        })?;
        let source = match (args.source_url, args.source_file) {
            (Some(_), Some(_)) => {
                return Err(CliError::ConflictingArguments {
                    first: ARG_SOURCE_URL,
                    second: ARG_SOURCE_FILE,
                });
            }
            (None, Some(path)) => SourceChoice::File(path),
            (url, None) => {
                let raw = url.unwrap_or_else(|| DEFAULT_REGISTRY_URL.to_owned());
                let parsed =
                    SourceUrl::try_from(raw.as_str()).map_err(|err| CliError::InvalidValue {
                        field: ARG_SOURCE_URL,
                        value: raw.clone(),
                        reason: err.to_string(),
                    })?;
                SourceChoice::Http(parsed)
            }
        };
        let timeout_secs = args.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        Ok(Self {
            database,
            source,
            user_agent: args
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned()),
            timeout: positive_seconds(ARG_TIMEOUT_SECS, timeout_secs)?,
            options: PipelineOptions {
                validation: args.validation.unwrap_or_default(),
                hash_mode: args.hash_mode.unwrap_or_default(),
            },
        })
    }

    fn build_source(&self) -> Result<Box<dyn RegistrySource>, CliError> {
        Ok(match &self.source {
            SourceChoice::Http(url) => Box::new(
                HttpRegistrySource::new(url.clone())?
                    .with_user_agent(self.user_agent.as_str())
                    .with_timeout(self.timeout),
            ),
            SourceChoice::File(path) => Box::new(FileRegistrySource::new(path.clone())),
        })
    }
}

impl TryFrom<SyncArgs> for SyncConfig {
    type Error = CliError;

    fn try_from(args: SyncArgs) -> Result<Self, Self::Error> {
        Self::resolve(args, ENV_SYNC_DATABASE)
    }
}

/// Resolved `watch` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WatchConfig {
    pub(crate) sync: SyncConfig,
    pub(crate) interval: Duration,
}

impl TryFrom<WatchArgs> for WatchConfig {
    type Error = CliError;

    fn try_from(args: WatchArgs) -> Result<Self, Self::Error> {
        let interval_secs = args.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS);
        let sync = SyncArgs {
            database: args.database,
            source_url: args.source_url,
            source_file: args.source_file,
            user_agent: args.user_agent,
            timeout_secs: args.timeout_secs,
            validation: args.validation,
            hash_mode: args.hash_mode,
        };
        Ok(Self {
            sync: SyncConfig::resolve(sync, ENV_WATCH_DATABASE)?,
            interval: positive_seconds(ARG_INTERVAL_SECS, interval_secs)?,
        })
    }
}

fn positive_seconds(field: &'static str, seconds: u64) -> Result<Duration, CliError> {
    if seconds == 0 {
        Err(CliError::InvalidValue {
            field,
            value: seconds.to_string(),
            reason: "must be at least one second".to_owned(),
        })
    } else {
        Ok(Duration::from_secs(seconds))
    }
}

/// Create the database's parent directories and open the store.
pub(crate) fn open_store(database: &Utf8Path) -> Result<SqliteAggregateStore, CliError> {
    pcidb_fs::create_parent_dirs(database).map_err(|source| CliError::PrepareDatabase {
        path: database.to_path_buf(),
        source,
    })?;
    SqliteAggregateStore::open(database.as_std_path()).map_err(|source| CliError::OpenStore {
        path: database.to_path_buf(),
        source,
    })
}

pub(super) fn run_sync(args: SyncArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let mut store = open_store(&config.database)?;
    let source = config.build_source()?;
    block_on_interruptible(|cancel| async move {
        sync_once(&*source, &mut store, config.options, &cancel, writer).await
    })?
    .map(|_| ())
}

pub(super) fn run_watch(args: WatchArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let mut store = open_store(&config.sync.database)?;
    let source = config.sync.build_source()?;
    block_on_interruptible(|cancel| async move {
        watch_loop(
            &*source,
            &mut store,
            config.sync.options,
            config.interval,
            &cancel,
            writer,
        )
        .await
    })?
    .map(|_| ())
}

/// Drive `task` on a current-thread runtime, cancelling it on Ctrl-C.
fn block_on_interruptible<F, Fut>(task: F) -> Result<Fut::Output, CliError>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    Ok(runtime.block_on(async move {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received; cancelling");
                interrupt.cancel();
            }
        });
        task(cancel).await
    }))
}

/// Run one pass and report it on `writer`.
pub(crate) async fn sync_once<R, S>(
    source: &R,
    store: &mut S,
    options: PipelineOptions,
    cancel: &CancellationToken,
    writer: &mut dyn Write,
) -> Result<RunReport, CliError>
where
    R: RegistrySource + ?Sized,
    S: AggregateStore + ?Sized,
{
    let report = run_pipeline(source, store, options, cancel).await?;
    write_report(writer, &report)?;
    Ok(report)
}

/// Run passes until `cancel` fires, sleeping `interval` after each one, and
/// return how many passes ran to completion or failure.
///
/// Failed passes are logged and retried after the next sleep. A cancelled pass
/// ends the loop without counting.
pub(crate) async fn watch_loop<R, S>(
    source: &R,
    store: &mut S,
    options: PipelineOptions,
    interval: Duration,
    cancel: &CancellationToken,
    writer: &mut dyn Write,
) -> Result<usize, CliError>
where
    R: RegistrySource + ?Sized,
    S: AggregateStore + ?Sized,
{
    let mut passes = 0_usize;
    loop {
        match run_pipeline(source, &mut *store, options, cancel).await {
            Ok(report) => write_report(writer, &report)?,
            Err(PipelineError::Cancelled) => break,
            Err(err) => warn!("ingestion pass failed: {err}"),
        }
        passes += 1;
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }
    }
    info!("watch stopped after {passes} passes");
    Ok(passes)
}

fn write_report(writer: &mut dyn Write, report: &RunReport) -> Result<(), CliError> {
    writeln!(writer, "{report}").map_err(CliError::WriteOutput)
}

#[cfg(test)]
pub(crate) fn sync_config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<SyncConfig, CliError> {
    let merged = SyncArgs::merge_from_layers(layers).map_err(CliError::from)?;
    SyncConfig::try_from(merged)
}
