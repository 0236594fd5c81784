#![cfg(test)]

use serde_json::json;

use super::common::{Journal, entries, entries_with, journal, journaled, record, setup_test_environment};
use crate::kernel::bootstrap::Backend;
use crate::kernel::error::{Error, Result};
use crate::plugin_system::plugin::HookError;
use crate::transaction::{ChangeSet, CommitOp, TransactionError, TransactionState};

/// Two plugins sharing the interfaces subtree:
/// - `link` applies each interface with a key dependency at priority 5
/// - `routing` recomputes routes once per commit with a tree dependency at
///   priority 10, and refuses MTUs above 9000 during validation
async fn network_backend(log: &Journal) -> Result<(tempfile::TempDir, Backend)> {
    let (temp_dir, mut backend) = setup_test_environment();

    let link_log = log.clone();
    backend
        .register_plugin(
            journaled("link", log)
                .on_init(move |_, registrar| {
                    for key in ["interfaces.eth0", "interfaces.eth1"] {
                        let log = link_log.clone();
                        registrar.register_key(
                            5,
                            move |_, op, data| {
                                let key = data.target_key.or(data.source_key).unwrap_or_default();
                                record(&log, format!("link {} {}", op, key));
                                Ok(())
                            },
                            None,
                            key,
                        )?;
                    }
                    Ok(())
                })
                .build(),
        )
        .await?;

    let routing_log = log.clone();
    backend
        .register_plugin(
            journaled("routing", log)
                .on_init(move |_, registrar| {
                    let log = routing_log.clone();
                    registrar.register_tree(
                        10,
                        move |_, op, data| {
                            record(&log, format!("routing {} {} change(s)", op, data.changes.len()));
                            Ok(())
                        },
                        None,
                        "interfaces",
                    )?;
                    registrar.register_validate_tree(
                        1,
                        |_, _, data| {
                            let too_big = data
                                .changes
                                .iter()
                                .filter_map(|change| change.target_values.get("mtu"))
                                .any(|mtu| mtu.as_u64().is_some_and(|mtu| mtu > 9000));
                            if too_big { Err(HookError::msg("mtu out of range")) } else { Ok(()) }
                        },
                        None,
                        "interfaces",
                    )?;
                    Ok(())
                })
                .build(),
        )
        .await?;

    backend.initialize().await?;
    Ok((temp_dir, backend))
}

fn change_set(value: serde_json::Value) -> ChangeSet {
    serde_json::from_value(value).expect("valid change set")
}

#[tokio::test]
async fn test_commit_orders_callbacks_by_priority() -> Result<()> {
    let log = journal();
    let (_temp_dir, backend) = network_backend(&log).await?;

    let summary = backend
        .commit(change_set(json!({
            "changes": [
                {"op": "add", "key": "interfaces.eth0", "target_values": {"mtu": 1500}},
                {"op": "add", "key": "interfaces.eth1", "target_values": {"mtu": 9000}}
            ]
        })))
        .await?;

    assert_eq!(summary.state, TransactionState::Ended);
    assert_eq!(summary.callbacks, 4, "one validation, two key and one tree callback");
    assert_eq!(
        entries(&log),
        vec![
            "link:begin",
            "routing:begin",
            "link:complete",
            "routing:complete",
            "link ADD interfaces.eth0",
            "link ADD interfaces.eth1",
            "routing ADD 2 change(s)",
            "link:end",
            "routing:end",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_failed_validation_aborts_without_commit_callbacks() -> Result<()> {
    let log = journal();
    let (_temp_dir, backend) = network_backend(&log).await?;

    let err = backend
        .commit(change_set(json!({
            "changes": [
                {"op": "change", "key": "interfaces.eth0",
                 "source_values": {"mtu": 1500}, "target_values": {"mtu": 9216}}
            ]
        })))
        .await
        .unwrap_err();

    match err {
        Error::Transaction(TransactionError::Callback { plugin, key, op, .. }) => {
            assert_eq!(plugin, "routing");
            assert_eq!(key, "interfaces");
            assert_eq!(op, CommitOp::Change);
        }
        other => panic!("Expected a validation failure, got {:?}", other),
    }
    assert!(entries_with(&log, "link ").is_empty());
    assert!(entries_with(&log, "routing ").is_empty());
    assert_eq!(entries_with(&log, "link:"), vec!["link:begin", "link:abort"]);
    Ok(())
}

#[tokio::test]
async fn test_mixed_subtree_change_aggregates_to_change() -> Result<()> {
    let log = journal();
    let (_temp_dir, backend) = network_backend(&log).await?;

    backend
        .commit(change_set(json!({
            "changes": [
                {"op": "delete", "key": "interfaces.eth0", "source_values": {"mtu": 1500}},
                {"op": "add", "key": "interfaces.eth1", "target_values": {"mtu": 1500}}
            ]
        })))
        .await?;

    assert_eq!(
        entries_with(&log, "link ").into_iter().chain(entries_with(&log, "routing ")).collect::<Vec<_>>(),
        vec!["link DELETE interfaces.eth0", "link ADD interfaces.eth1", "routing CHANGE 2 change(s)"]
    );
    Ok(())
}

#[tokio::test]
async fn test_validate_stops_after_complete() -> Result<()> {
    let log = journal();
    let (_temp_dir, backend) = network_backend(&log).await?;

    let summary = backend
        .validate(change_set(json!({
            "changes": [{"op": "add", "key": "interfaces.eth0", "target_values": {"mtu": 1500}}]
        })))
        .await?;

    assert_eq!(summary.state, TransactionState::Completed);
    assert_eq!(entries(&log), vec!["link:begin", "routing:begin", "link:complete", "routing:complete"]);
    Ok(())
}

#[tokio::test]
async fn test_untouched_keys_trigger_nothing() -> Result<()> {
    let log = journal();
    let (_temp_dir, backend) = network_backend(&log).await?;

    let summary = backend
        .commit(change_set(json!({
            "source": "startup",
            "changes": [{"op": "add", "key": "system.hostname", "target_values": {"name": "edge"}}]
        })))
        .await?;

    assert_eq!(summary.callbacks, 0);
    assert_eq!(entries(&log).len(), 6, "only the phase hooks ran");
    Ok(())
}
