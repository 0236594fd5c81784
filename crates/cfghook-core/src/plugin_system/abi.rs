//! # Dynamic Plugin ABI
//!
//! Signatures of the hook symbols a plugin library may export, and helpers
//! for plugin authors to turn the raw arguments back into references.
//!
//! Every hook returns a C status: zero or positive is success, negative is
//! failure. `Handle`, `Registrar` and `TransactionContext` cross the boundary
//! as opaque pointers, so a plugin library must be built against the same
//! `cfghook-core` and toolchain as the host.
use std::ffi::{CStr, CString, c_char, c_int, c_void};

use crate::dependency::Registrar;
use crate::kernel::handle::Handle;
use crate::plugin_system::plugin::HookResult;
use crate::transaction::TransactionContext;

pub const STATUS_OK: c_int = 0;
pub const STATUS_ERROR: c_int = -1;

/// `plugin_init(handle, registrar)`
pub type RawInitFn = unsafe extern "C-unwind" fn(*const Handle, *mut c_void) -> c_int;
/// `plugin_start(handle, argc, argv)`
pub type RawStartFn = unsafe extern "C-unwind" fn(*const Handle, c_int, *const *const c_char) -> c_int;
/// `plugin_exit(handle)` and `plugin_reset(handle)`
pub type RawHandleFn = unsafe extern "C-unwind" fn(*const Handle) -> c_int;
/// `transaction_begin/complete/end/abort(handle, ctx)`
pub type RawTransactionFn = unsafe extern "C-unwind" fn(*const Handle, *const TransactionContext) -> c_int;

/// Convert a hook outcome into the status returned across the boundary.
///
/// Only the sign survives: the host reports a failure as `returned status -1`.
/// A `cdylib` plugin links its own copy of `log` with no logger installed, so
/// the `debug!` below and any other `log` call made inside the plugin are
/// dropped. A plugin that needs its diagnostics seen must write them itself,
/// as the audit-log example does with its file.
pub fn status(result: HookResult) -> c_int {
    match result {
        Ok(()) => STATUS_OK,
        Err(err) => {
            log::debug!("Plugin hook failed: {}", err);
            STATUS_ERROR
        }
    }
}

/// # Safety
/// `ptr` must be null or point to the `Handle` passed by the host to the
/// current hook call.
pub unsafe fn handle_ref<'a>(ptr: *const Handle) -> Option<&'a Handle> {
    unsafe { ptr.as_ref() }
}

/// # Safety
/// `ptr` must be null or be the registrar pointer passed to `plugin_init`
/// during the current call.
pub unsafe fn registrar_mut<'a, 'r>(ptr: *mut c_void) -> Option<&'a mut Registrar<'r>> {
    unsafe { (ptr as *mut Registrar<'r>).as_mut() }
}

/// # Safety
/// `ptr` must be null or point to the `TransactionContext` passed by the host
/// to the current phase hook call.
pub unsafe fn transaction_ref<'a>(ptr: *const TransactionContext) -> Option<&'a TransactionContext> {
    unsafe { ptr.as_ref() }
}

/// Copy the arguments of `plugin_start` into owned strings.
///
/// # Safety
/// `argv` must be null or point to `argc` valid NUL-terminated strings.
pub unsafe fn args_from_raw(argc: c_int, argv: *const *const c_char) -> Vec<String> {
    if argv.is_null() || argc <= 0 {
        return Vec::new();
    }
    let raw = unsafe { std::slice::from_raw_parts(argv, argc as usize) };
    raw.iter()
        .filter(|arg| !arg.is_null())
        .map(|arg| unsafe { CStr::from_ptr(*arg) }.to_string_lossy().into_owned())
        .collect()
}

/// Owned C argument vector handed to `plugin_start`
pub(crate) struct RawArgs {
    _owned: Vec<CString>,
    pointers: Vec<*const c_char>,
}

impl RawArgs {
    pub(crate) fn new(args: &[String]) -> Self {
        // Interior NULs cannot cross the boundary; such arguments are truncated at the NUL.
        let owned: Vec<CString> = args
            .iter()
            .map(|arg| {
                let bytes = arg.split('\0').next().unwrap_or_default();
                CString::new(bytes).unwrap_or_default()
            })
            .collect();
        let pointers = owned.iter().map(|arg| arg.as_ptr()).collect();
        Self { _owned: owned, pointers }
    }

    pub(crate) fn argc(&self) -> c_int {
        self.pointers.len() as c_int
    }

    pub(crate) fn argv(&self) -> *const *const c_char {
        if self.pointers.is_empty() { std::ptr::null() } else { self.pointers.as_ptr() }
    }
}
