#![cfg(test)]

use std::fs;

use super::common::{entries, entries_with, example_plugin_path, journal, journaled, record, setup_test_environment};
use crate::config::BackendConfig;
use crate::kernel::bootstrap::Backend;
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::plugin_system::plugin::{HookError, HookKind};
use crate::transaction::{ChangeSet, KeyChange, TransactionError, ValueVec};

#[tokio::test]
async fn test_full_lifecycle_order() -> Result<()> {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = BackendConfig::with_backend_dir(temp_dir.path());
    config.reset_on_start = true;
    let mut backend = Backend::new(config);
    let log = journal();

    for name in ["a", "b"] {
        let init_log = log.clone();
        let entry = format!("{}:init", name);
        backend
            .register_plugin(
                journaled(name, &log)
                    .on_init(move |_, _| {
                        record(&init_log, entry.clone());
                        Ok(())
                    })
                    .build(),
            )
            .await?;
    }

    backend.run(&[]).await?;
    backend.commit(ChangeSet::default()).await?;
    backend.shutdown().await?;

    assert_eq!(
        entries(&log),
        vec![
            "a:init", "b:init", "a:reset", "b:reset", "a:start", "b:start", "a:begin", "b:begin", "a:complete",
            "b:complete", "a:end", "b:end", "a:exit", "b:exit",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_begin_veto_aborts_every_plugin() -> Result<()> {
    let (_temp_dir, mut backend) = setup_test_environment();
    let log = journal();
    let veto_log = log.clone();

    backend.register_plugin(journaled("a", &log).build()).await?;
    backend
        .register_plugin(
            journaled("b", &log)
                .on_begin(move |_, _| {
                    record(&veto_log, "b:begin");
                    Err(HookError::msg("not today"))
                })
                .build(),
        )
        .await?;
    backend.register_plugin(journaled("c", &log).build()).await?;
    backend.initialize().await?;

    let err = backend.commit(ChangeSet::default()).await.unwrap_err();

    match err {
        Error::Transaction(TransactionError::PhaseVeto { phase, plugin, .. }) => {
            assert_eq!(phase, HookKind::Begin);
            assert_eq!(plugin, "b");
        }
        other => panic!("Expected a begin veto, got {:?}", other),
    }
    assert_eq!(
        entries(&log),
        vec!["a:begin", "b:begin", "a:abort", "b:abort", "c:abort"],
        "c never begins but is still aborted"
    );
    Ok(())
}

#[tokio::test]
async fn test_start_failure_stops_fan_out() -> Result<()> {
    let (_temp_dir, mut backend) = setup_test_environment();
    let log = journal();

    backend.register_plugin(journaled("a", &log).build()).await?;
    backend
        .register_plugin(journaled("b", &log).on_start(|_, _| Err(HookError::Status(-1))).build())
        .await?;
    backend.register_plugin(journaled("c", &log).build()).await?;

    let err = backend.run(&[]).await.unwrap_err();

    assert!(matches!(err, Error::KernelLifecycleError { phase: KernelLifecyclePhase::Start, .. }));
    assert_eq!(entries_with(&log, "c:"), Vec::<String>::new());
    assert!(!backend.is_started());
    backend.shutdown().await?;
    assert_eq!(entries_with(&log, "c:"), vec!["c:exit"]);
    Ok(())
}

#[tokio::test]
async fn test_plugins_share_data_through_handle() -> Result<()> {
    let (_temp_dir, mut backend) = setup_test_environment();
    let log = journal();
    let seen = log.clone();

    backend
        .register_plugin(
            journaled("publisher", &log)
                .on_start(|handle, args| {
                    handle.set_data("hostname", args.first().cloned().unwrap_or_default());
                    Ok(())
                })
                .build(),
        )
        .await?;
    backend
        .register_plugin(
            journaled("consumer", &log)
                .on_begin(move |handle, _| {
                    let hostname = handle.get_data::<String>("hostname").ok_or_else(|| HookError::msg("no hostname"))?;
                    record(&seen, format!("consumer saw {}", hostname));
                    Ok(())
                })
                .build(),
        )
        .await?;

    backend.run(&["edge-1".to_string()]).await?;
    backend.commit(ChangeSet::default()).await?;
    backend.shutdown().await?;

    assert_eq!(entries_with(&log, "consumer saw"), vec!["consumer saw edge-1"]);
    Ok(())
}

#[tokio::test]
async fn test_example_plugin_as_master() -> Result<()> {
    let example_plugin = match example_plugin_path() {
        Some(path) => path,
        None => {
            println!("Skipping test: Could not find the compiled example plugin.");
            println!("Please build the 'audit-log' plugin first with: cargo build -p audit-log");
            return Ok(());
        }
    };

    let temp_dir = tempfile::tempdir().unwrap();
    let file_name = example_plugin.file_name().unwrap();
    fs::copy(&example_plugin, temp_dir.path().join(file_name)).unwrap();
    let stem = example_plugin.file_stem().unwrap().to_string_lossy().into_owned();

    let mut config = BackendConfig::with_backend_dir(temp_dir.path());
    config.master_plugin = Some(stem.clone());
    let mut backend = Backend::new(config);

    backend.run(&["--audit".to_string()]).await?;
    backend
        .commit(ChangeSet {
            changes: vec![
                KeyChange::add("interfaces.eth0", ValueVec::new()),
                KeyChange::add("system.hostname", ValueVec::new()),
            ],
            ..ChangeSet::default()
        })
        .await?;
    backend.shutdown().await?;

    let audit = fs::read_to_string(temp_dir.path().join("audit.log")).expect("audit log written");
    let lines: Vec<&str> = audit.lines().collect();
    assert_eq!(lines.first(), Some(&"start --audit"));
    assert!(lines.iter().any(|line| line.starts_with("ADD interfaces")));
    assert!(!audit.contains("system.hostname"), "Changes outside the subtree are not audited");
    assert_eq!(lines.last(), Some(&"exit"));
    Ok(())
}
