/// Application name
pub const APP_NAME: &str = "cfghook";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default application plugin directory
pub const DEFAULT_BACKEND_DIR: &str = "plugins/backend";

/// Snapshot identity of the committed configuration
pub const RUNNING_DB: &str = "running";

/// Snapshot identity of the configuration being committed
pub const CANDIDATE_DB: &str = "candidate";

/// Separator between key path segments
pub const KEY_SEPARATOR: char = '.';

/// Symbol names of the eight lifecycle hooks a plugin library may export
pub const PLUGIN_INIT: &str = "plugin_init";
pub const PLUGIN_START: &str = "plugin_start";
pub const PLUGIN_EXIT: &str = "plugin_exit";
pub const PLUGIN_RESET: &str = "plugin_reset";
pub const PLUGIN_BEGIN: &str = "transaction_begin";
pub const PLUGIN_COMPLETE: &str = "transaction_complete";
pub const PLUGIN_END: &str = "transaction_end";
pub const PLUGIN_ABORT: &str = "transaction_abort";
