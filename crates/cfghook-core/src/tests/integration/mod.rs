pub mod common;
mod commit_flow;
mod lifecycle;
