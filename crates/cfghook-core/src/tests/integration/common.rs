#![cfg(test)]

use std::env;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};

use tempfile::TempDir;

use crate::config::BackendConfig;
use crate::kernel::bootstrap::Backend;
use crate::plugin_system::plugin::{HookResult, Plugin, PluginBuilder};

// ===== TRACKING =====

/// Shared journal of everything the test plugins observe
pub type Journal = Arc<StdMutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(StdMutex::new(Vec::new()))
}

pub fn record(journal: &Journal, entry: impl Into<String>) {
    journal.lock().unwrap().push(entry.into());
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

/// Entries that start with `prefix`
pub fn entries_with(journal: &Journal, prefix: &str) -> Vec<String> {
    entries(journal).into_iter().filter(|entry| entry.starts_with(prefix)).collect()
}

// ===== PLUGINS =====

/// Builder pre-wired with phase hooks that journal `<name>:<phase>`
pub fn journaled(name: &str, journal: &Journal) -> PluginBuilder {
    let phase = |phase: &'static str| {
        let journal = journal.clone();
        let entry = format!("{}:{}", name, phase);
        move || -> HookResult {
            record(&journal, entry.clone());
            Ok(())
        }
    };
    let (start, reset, exit) = (phase("start"), phase("reset"), phase("exit"));
    let (begin, complete, end, abort) = (phase("begin"), phase("complete"), phase("end"), phase("abort"));

    Plugin::builder(name)
        .on_start(move |_, _| start())
        .on_reset(move |_| reset())
        .on_exit(move |_| exit())
        .on_begin(move |_, _| begin())
        .on_complete(move |_, _| complete())
        .on_end(move |_, _| end())
        .on_abort(move |_, _| abort())
}

// ===== ENVIRONMENT =====

/// Backend over an empty temporary plugin directory. Keep the `TempDir`
/// alive for the duration of the test.
pub fn setup_test_environment() -> (TempDir, Backend) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let backend = Backend::new(BackendConfig::with_backend_dir(temp_dir.path()));
    (temp_dir, backend)
}

/// Path of the compiled audit-log example plugin, if it has been built
pub fn example_plugin_path() -> Option<PathBuf> {
    let current_dir = env::current_dir().ok()?;
    let plugin_file = format!("{}audit_log.{}", env::consts::DLL_PREFIX, env::consts::DLL_EXTENSION);

    [
        current_dir.join("../../target/debug"),
        current_dir.join("target/debug"),
    ]
    .into_iter()
    .map(|dir| dir.join(&plugin_file))
    .find(|path| path.exists())
}
