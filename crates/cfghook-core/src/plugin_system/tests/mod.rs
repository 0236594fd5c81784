pub mod common;
pub mod abi_tests;
