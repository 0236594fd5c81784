//! Example cfghook plugin.
//!
//! Appends one line per lifecycle event to `audit.log` in the backend
//! directory, and one line per commit touching the `interfaces` subtree.
//! Built as a `cdylib` it exports the eight hook symbols; as an `rlib` the same
//! behavior is available in-process through [`plugin`].
//!
//! Loaded dynamically, the `debug!` output of this crate goes nowhere: the
//! library's copy of `log` never gets a logger. `audit.log` is the record.
use std::ffi::{c_char, c_int, c_void};
use std::fs::OpenOptions;
use std::io::Write;

use cfghook_core::dependency::Registrar;
use cfghook_core::kernel::Handle;
use cfghook_core::plugin_system::abi::{
    STATUS_ERROR, args_from_raw, handle_ref, registrar_mut, status, transaction_ref,
};
use cfghook_core::plugin_system::plugin::{HookError, HookResult, Plugin};
use cfghook_core::transaction::{CommitData, CommitOp, TransactionContext};
use log::debug;

const PLUGIN_NAME: &str = "audit-log";
const AUDIT_FILE: &str = "audit.log";
const WATCHED_TREE: &str = "interfaces";
const PRIORITY: u16 = 100;

fn append(handle: &Handle, line: &str) -> HookResult {
    let path = handle.backend_dir().join(AUDIT_FILE);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| HookError::msg(format!("cannot open {}: {}", path.display(), e)))?;
    writeln!(file, "{}", line).map_err(|e| HookError::msg(format!("cannot write {}: {}", path.display(), e)))
}

fn audit_interfaces(handle: &Handle, op: CommitOp, data: &CommitData<'_>) -> HookResult {
    let key = data.target_key.or(data.source_key).unwrap_or(WATCHED_TREE);
    debug!("{}: {} {}", PLUGIN_NAME, op, key);
    append(handle, &format!("{} {} ({} change(s))", op, key, data.changes.len()))
}

fn init(_handle: &Handle, registrar: &mut Registrar<'_>) -> HookResult {
    registrar.register_tree(PRIORITY, audit_interfaces, None, WATCHED_TREE)?;
    Ok(())
}

fn start(handle: &Handle, args: &[String]) -> HookResult {
    append(handle, &format!("start {}", args.join(" ")))
}

fn phase(name: &'static str) -> impl Fn(&Handle, &TransactionContext) -> HookResult + Send + Sync + 'static {
    move |handle, ctx| append(handle, &format!("{} {}", name, ctx.id()))
}

/// The plugin as an in-process descriptor
pub fn plugin() -> Plugin {
    Plugin::builder(PLUGIN_NAME)
        .on_init(init)
        .on_start(start)
        .on_exit(|handle| append(handle, "exit"))
        .on_reset(|handle| append(handle, "reset"))
        .on_begin(phase("begin"))
        .on_complete(phase("complete"))
        .on_end(phase("end"))
        .on_abort(phase("abort"))
        .build()
}

// --- Exported hook symbols ---

/// # Safety
/// Called by the host with the pointers described in `cfghook_core::plugin_system::abi`.
#[unsafe(no_mangle)]
pub unsafe extern "C-unwind" fn plugin_init(handle: *const Handle, registrar: *mut c_void) -> c_int {
    let (Some(handle), Some(registrar)) = (unsafe { handle_ref(handle) }, unsafe { registrar_mut(registrar) }) else {
        return STATUS_ERROR;
    };
    status(init(handle, registrar))
}

/// # Safety
/// Called by the host with the pointers described in `cfghook_core::plugin_system::abi`.
#[unsafe(no_mangle)]
pub unsafe extern "C-unwind" fn plugin_start(handle: *const Handle, argc: c_int, argv: *const *const c_char) -> c_int {
    let Some(handle) = (unsafe { handle_ref(handle) }) else {
        return STATUS_ERROR;
    };
    let args = unsafe { args_from_raw(argc, argv) };
    status(start(handle, &args))
}

/// # Safety
/// Called by the host with the pointers described in `cfghook_core::plugin_system::abi`.
#[unsafe(no_mangle)]
pub unsafe extern "C-unwind" fn plugin_exit(handle: *const Handle) -> c_int {
    match unsafe { handle_ref(handle) } {
        Some(handle) => status(append(handle, "exit")),
        None => STATUS_ERROR,
    }
}

/// # Safety
/// Called by the host with the pointers described in `cfghook_core::plugin_system::abi`.
#[unsafe(no_mangle)]
pub unsafe extern "C-unwind" fn plugin_reset(handle: *const Handle) -> c_int {
    match unsafe { handle_ref(handle) } {
        Some(handle) => status(append(handle, "reset")),
        None => STATUS_ERROR,
    }
}

unsafe fn transaction_hook(name: &'static str, handle: *const Handle, ctx: *const TransactionContext) -> c_int {
    match (unsafe { handle_ref(handle) }, unsafe { transaction_ref(ctx) }) {
        (Some(handle), Some(ctx)) => status(phase(name)(handle, ctx)),
        _ => STATUS_ERROR,
    }
}

/// # Safety
/// Called by the host with the pointers described in `cfghook_core::plugin_system::abi`.
#[unsafe(no_mangle)]
pub unsafe extern "C-unwind" fn transaction_begin(handle: *const Handle, ctx: *const TransactionContext) -> c_int {
    unsafe { transaction_hook("begin", handle, ctx) }
}

/// # Safety
/// Called by the host with the pointers described in `cfghook_core::plugin_system::abi`.
#[unsafe(no_mangle)]
pub unsafe extern "C-unwind" fn transaction_complete(handle: *const Handle, ctx: *const TransactionContext) -> c_int {
    unsafe { transaction_hook("complete", handle, ctx) }
}

/// # Safety
/// Called by the host with the pointers described in `cfghook_core::plugin_system::abi`.
#[unsafe(no_mangle)]
pub unsafe extern "C-unwind" fn transaction_end(handle: *const Handle, ctx: *const TransactionContext) -> c_int {
    unsafe { transaction_hook("end", handle, ctx) }
}

/// # Safety
/// Called by the host with the pointers described in `cfghook_core::plugin_system::abi`.
#[unsafe(no_mangle)]
pub unsafe extern "C-unwind" fn transaction_abort(handle: *const Handle, ctx: *const TransactionContext) -> c_int {
    unsafe { transaction_hook("abort", handle, ctx) }
}
