//! Focused unit tests covering sync, watch and show configuration.

use super::helpers::Workspace;
use super::*;
use crate::show::show_database_from_layers_for_test;
use crate::sync::{
    SourceChoice, SyncArgs, SyncConfig, WatchArgs, WatchConfig, sync_config_from_layers_for_test,
};
use camino::Utf8PathBuf;
use ortho_config::MergeComposer;
use pcidb_core::{HashMode, ValidationPolicy};
use pcidb_data::source::{DEFAULT_REGISTRY_URL, DEFAULT_USER_AGENT};
use pcidb_data::{PipelineOptions, SourceUrl};
use rstest::rstest;
use serde_json::json;
use std::time::Duration;

fn with_database() -> SyncArgs {
    SyncArgs {
        database: Some(Utf8PathBuf::from("pcidb.sqlite")),
        ..SyncArgs::default()
    }
}

#[rstest]
fn converting_sync_without_database_errors() {
    let err = SyncConfig::try_from(SyncArgs::default()).expect_err("missing database");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_DATABASE);
            assert_eq!(env, ENV_SYNC_DATABASE);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn converting_watch_without_database_names_watch_env() {
    let err = WatchConfig::try_from(WatchArgs::default()).expect_err("missing database");
    match err {
        CliError::MissingArgument { env, .. } => assert_eq!(env, ENV_WATCH_DATABASE),
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn sync_defaults_to_upstream_registry() {
    let config = SyncConfig::try_from(with_database()).expect("config");
    assert_eq!(
        config.source,
        SourceChoice::Http(SourceUrl::try_from(DEFAULT_REGISTRY_URL).expect("default URL"))
    );
    assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    assert_eq!(config.timeout, Duration::from_secs(120));
    assert_eq!(config.options, PipelineOptions::default());
}

#[rstest]
fn watch_defaults_to_a_daily_interval() {
    let args = WatchArgs {
        database: Some(Utf8PathBuf::from("pcidb.sqlite")),
        ..WatchArgs::default()
    };
    let config = WatchConfig::try_from(args).expect("config");
    assert_eq!(config.interval, Duration::from_secs(86_400));
}

#[rstest]
fn source_file_selects_a_file_source() {
    let args = SyncArgs {
        source_file: Some(Utf8PathBuf::from("pci.ids")),
        validation: Some(ValidationPolicy::Lenient),
        hash_mode: Some(HashMode::Corrected),
        ..with_database()
    };
    let config = SyncConfig::try_from(args).expect("config");
    assert_eq!(config.source, SourceChoice::File(Utf8PathBuf::from("pci.ids")));
    assert_eq!(
        config.options,
        PipelineOptions {
            validation: ValidationPolicy::Lenient,
            hash_mode: HashMode::Corrected,
        }
    );
}

#[rstest]
fn url_and_file_sources_conflict() {
    let args = SyncArgs {
        source_url: Some("https://example.org/pci.ids".to_owned()),
        source_file: Some(Utf8PathBuf::from("pci.ids")),
        ..with_database()
    };
    let err = SyncConfig::try_from(args).expect_err("conflict");
    assert!(matches!(
        err,
        CliError::ConflictingArguments {
            first: ARG_SOURCE_URL,
            second: ARG_SOURCE_FILE
        }
    ));
}

#[rstest]
#[case(SyncArgs { source_url: Some("not a url".to_owned()), ..with_database() }, ARG_SOURCE_URL)]
#[case(SyncArgs { timeout_secs: Some(0), ..with_database() }, ARG_TIMEOUT_SECS)]
fn invalid_values_are_rejected(#[case] args: SyncArgs, #[case] expected: &'static str) {
    let err = SyncConfig::try_from(args).expect_err("invalid value");
    match err {
        CliError::InvalidValue { field, .. } => assert_eq!(field, expected),
        other => panic!("expected InvalidValue, found {other:?}"),
    }
}

#[rstest]
fn zero_watch_interval_is_rejected() {
    let args = WatchArgs {
        database: Some(Utf8PathBuf::from("pcidb.sqlite")),
        interval_secs: Some(0),
        ..WatchArgs::default()
    };
    let err = WatchConfig::try_from(args).expect_err("zero interval");
    assert!(matches!(
        err,
        CliError::InvalidValue {
            field: ARG_INTERVAL_SECS,
            ..
        }
    ));
}

#[rstest]
fn clap_parses_policies_and_modes() {
    let cli = Cli::try_parse_from([
        "pcidb",
        "sync",
        "--database",
        "db.sqlite",
        "--validation",
        "lenient",
        "--hash-mode",
        "corrected",
    ])
    .expect("arguments should parse");
    match cli.command {
        Command::Sync(args) => {
            assert_eq!(args.validation, Some(ValidationPolicy::Lenient));
            assert_eq!(args.hash_mode, Some(HashMode::Corrected));
        }
        other => panic!("expected sync, found {other:?}"),
    }
}

#[rstest]
fn clap_rejects_unknown_policies() {
    let err = Cli::try_parse_from(["pcidb", "sync", "--validation", "loose"])
        .expect_err("unknown policy");
    assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
}

#[rstest]
fn show_accepts_database_after_target() {
    let cli = Cli::try_parse_from(["pcidb", "show", "vendor", "10de", "--database", "db.sqlite"])
        .expect("arguments should parse");
    match cli.command {
        Command::Show { args, target } => {
            assert_eq!(args.database, Some(Utf8PathBuf::from("db.sqlite")));
            assert_eq!(
                target,
                crate::show::ShowTarget::Vendor {
                    id: "10de".to_owned()
                }
            );
        }
        other => panic!("expected show, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_maps_configuration_errors() {
    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "timeout_secs": "soon" }));
    let err = sync_config_from_layers_for_test(composer.layers())
        .expect_err("invalid config layer should map to CliError::Configuration");
    match err {
        CliError::Configuration(_) => {}
        other => panic!("expected CliError::Configuration, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_honours_precedence() {
    let workspace = Workspace::new();
    let file_db = workspace.root().join("from-file.sqlite");
    let env_db = workspace.root().join("from-env.sqlite");
    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "database": file_db.as_str(),
            "validation": "lenient",
            "timeout_secs": 30,
        }),
        None,
    );
    composer.push_environment(json!({
        "database": env_db.as_str(),
        "hash_mode": "corrected",
    }));
    composer.push_cli(json!({ "timeout_secs": 5 }));

    let config = sync_config_from_layers_for_test(composer.layers()).expect("merged config");
    assert_eq!(config.database, env_db);
    assert_eq!(config.timeout, Duration::from_secs(5));
    assert_eq!(
        config.options,
        PipelineOptions {
            validation: ValidationPolicy::Lenient,
            hash_mode: HashMode::Corrected,
        }
    );
}

#[rstest]
fn show_database_comes_from_layers() {
    let mut composer = MergeComposer::new();
    composer.push_environment(json!({ "database": "env.sqlite" }));
    let database = show_database_from_layers_for_test(composer.layers()).expect("database");
    assert_eq!(database, Utf8PathBuf::from("env.sqlite"));

    let mut empty = MergeComposer::new();
    empty.push_cli(json!({}));
    let err = show_database_from_layers_for_test(empty.layers()).expect_err("missing database");
    assert!(matches!(
        err,
        CliError::MissingArgument {
            env: ENV_SHOW_DATABASE,
            ..
        }
    ));
}

#[rstest]
fn merge_layers_without_database_reports_missing_argument() {
    let mut composer = MergeComposer::new();
    composer.push_environment(json!({ "timeout_secs": 30 }));
    composer.push_cli(json!({}));
    let err = sync_config_from_layers_for_test(composer.layers()).expect_err("missing database");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_DATABASE);
            assert_eq!(env, ENV_SYNC_DATABASE);
        }
        other => panic!("expected CliError::MissingArgument, found {other:?}"),
    }
}
