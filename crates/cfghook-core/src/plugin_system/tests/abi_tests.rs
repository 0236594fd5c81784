#![cfg(test)]

use std::ffi::{CString, c_char, c_int};

use crate::kernel::handle::Handle;
use crate::plugin_system::abi::{
    RawArgs, RawTransactionFn, STATUS_ERROR, STATUS_OK, args_from_raw, handle_ref, status, transaction_ref,
};
use crate::plugin_system::plugin::HookError;
use crate::transaction::TransactionContext;

#[test]
fn test_status_mapping() {
    assert_eq!(status(Ok(())), STATUS_OK);
    assert_eq!(status(Err(HookError::msg("nope"))), STATUS_ERROR);
    assert_eq!(HookError::from_status(0), Ok(()));
    assert_eq!(HookError::from_status(1), Ok(()));
    assert_eq!(HookError::from_status(-2), Err(HookError::Status(-2)));
}

#[test]
fn test_args_from_raw() {
    let owned = [CString::new("-f").unwrap(), CString::new("backend.conf").unwrap()];
    let pointers: Vec<*const c_char> = owned.iter().map(|arg| arg.as_ptr()).collect();

    let args = unsafe { args_from_raw(pointers.len() as c_int, pointers.as_ptr()) };

    assert_eq!(args, vec!["-f", "backend.conf"]);
    assert!(unsafe { args_from_raw(0, std::ptr::null()) }.is_empty());
}

#[test]
fn test_raw_args_round_trip_through_c_layout() {
    let args = vec!["run".to_string(), "with\0nul".to_string()];
    let raw = RawArgs::new(&args);

    assert_eq!(raw.argc(), 2);
    let back = unsafe { args_from_raw(raw.argc(), raw.argv()) };
    assert_eq!(back, vec!["run", "with"]);

    let empty = RawArgs::new(&[]);
    assert_eq!(empty.argc(), 0);
    assert!(empty.argv().is_null());
}

#[test]
fn test_null_pointers_convert_to_none() {
    assert!(unsafe { handle_ref(std::ptr::null()) }.is_none());
    assert!(unsafe { transaction_ref(std::ptr::null()) }.is_none());
}

unsafe extern "C-unwind" fn refuse_empty(handle: *const Handle, ctx: *const TransactionContext) -> c_int {
    let (Some(_handle), Some(ctx)) = (unsafe { handle_ref(handle) }, unsafe { transaction_ref(ctx) }) else {
        return STATUS_ERROR;
    };
    if ctx.changes().is_empty() { -3 } else { STATUS_OK }
}

#[test]
fn test_raw_transaction_hook_status() {
    let hook: RawTransactionFn = refuse_empty;
    let handle = Handle::default();
    let ctx = TransactionContext::new("running", "candidate", Vec::new());

    let status = unsafe { hook(&handle, &ctx) };

    assert_eq!(HookError::from_status(status), Err(HookError::Status(-3)));
}
