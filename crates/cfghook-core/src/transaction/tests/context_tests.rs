#![cfg(test)]

use crate::config::BackendConfig;
use crate::kernel::handle::Handle;
use crate::transaction::{ChangeSet, CommitOp, KeyChange, TransactionContext, TransactionState};

#[test]
fn test_new_context_is_idle_with_unique_id() {
    let first = TransactionContext::new("running", "candidate", Vec::new());
    let second = TransactionContext::new("running", "candidate", Vec::new());

    assert_ne!(first.id(), second.id());
    assert_eq!(first.state(), TransactionState::Idle);
    assert_eq!(first.source_db(), "running");
    assert_eq!(first.target_db(), "candidate");
    assert!(!first.has_arg());
}

#[test]
fn test_carry_over_argument() {
    let ctx = TransactionContext::new("a", "b", Vec::new());

    ctx.set_arg(42u64);
    assert!(ctx.has_arg());
    assert_eq!(ctx.with_arg(|value: &u64| *value + 1), Some(43));
    assert_eq!(ctx.with_arg(|value: &String| value.len()), None, "Wrong type yields None");

    ctx.set_arg("replaced".to_string());
    assert_eq!(ctx.with_arg(|value: &String| value.clone()), Some("replaced".to_string()));

    ctx.clear_arg();
    assert!(!ctx.has_arg());
}

#[test]
fn test_change_set_from_json_defaults() {
    let change_set = ChangeSet::from_json(
        r#"{
            "changes": [
                {"op": "add", "key": "interfaces.eth0", "target_values": {"mtu": 1500}},
                {"op": "delete", "key": "interfaces.eth1"}
            ]
        }"#,
    )
    .unwrap();

    assert_eq!(change_set.source, None);
    assert_eq!(change_set.changes.len(), 2);
    assert_eq!(change_set.changes[0].op, CommitOp::Add);
    assert_eq!(change_set.changes[0].target_values["mtu"], 1500);
    assert!(change_set.changes[1].source_values.is_empty());

    let mut config = BackendConfig::default();
    config.running_db = "startup".to_string();
    let ctx = change_set.into_context(&Handle::new(config));
    assert_eq!(ctx.source_db(), "startup");
    assert_eq!(ctx.target_db(), "candidate");
    assert_eq!(ctx.changes().len(), 2);
}

#[test]
fn test_change_set_explicit_databases() {
    let change_set = ChangeSet::from_json(r#"{"source": "snap-1", "target": "snap-2"}"#).unwrap();

    let ctx = change_set.into_context(&Handle::default());

    assert_eq!(ctx.source_db(), "snap-1");
    assert_eq!(ctx.target_db(), "snap-2");
    assert!(ctx.changes().is_empty());
}

#[test]
fn test_change_set_rejects_unknown_op() {
    assert!(ChangeSet::from_json(r#"{"changes": [{"op": "rename", "key": "a"}]}"#).is_err());
}

#[test]
fn test_commit_op_inversion() {
    assert_eq!(CommitOp::Add.invert(), CommitOp::Delete);
    assert_eq!(CommitOp::Delete.invert(), CommitOp::Add);
    assert_eq!(CommitOp::Change.invert(), CommitOp::Change);
    assert_eq!(KeyChange::change("k", Default::default(), Default::default()).op.to_string(), "CHANGE");
}
