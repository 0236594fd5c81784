use std::path::{Path, PathBuf};
use std::panic;

use libloading::Library;
use log::{debug, info};
use tokio::fs;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReadDirStream;

use crate::config::BackendConfig;
use crate::dependency::Registrar;
use crate::kernel::handle::Handle;
use crate::plugin_system::abi::{RawArgs, RawHandleFn, RawInitFn, RawStartFn, RawTransactionFn};
use crate::plugin_system::error::{PluginSystemError, PluginSystemErrorSource};
use crate::plugin_system::plugin::{
    HandleHook, HookError, HookKind, InitHook, Plugin, PluginHooks, StartHook, TransactionHook,
};
use crate::transaction::TransactionContext;
use crate::utils::panic_message;

/// Finds plugin artifacts in the configured directories and loads them as
/// shared libraries
#[derive(Debug, Clone)]
pub struct PluginLoader {
    /// Directories to search, in load order
    plugin_dirs: Vec<PathBuf>,
    /// Artifact extension, without the dot
    extension: String,
    /// File stem of the master plugin
    master: Option<String>,
}

impl PluginLoader {
    /// Create a loader for artifacts with the given extension
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            plugin_dirs: Vec::new(),
            extension: extension.into(),
            master: None,
        }
    }

    /// Loader for the directories, extension and master plugin of `config`
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            plugin_dirs: config.plugin_dirs(),
            extension: config.plugin_extension.clone(),
            master: config.master_plugin.clone(),
        }
    }

    /// Add a plugin directory to search
    pub fn add_plugin_dir<P: AsRef<Path>>(&mut self, dir: P) {
        self.plugin_dirs.push(dir.as_ref().to_path_buf());
    }

    pub fn set_master(&mut self, master: Option<String>) {
        self.master = master;
    }

    pub fn plugin_dirs(&self) -> &[PathBuf] {
        &self.plugin_dirs
    }

    /// Whether `path` is the master plugin artifact
    pub fn is_master(&self, path: &Path) -> bool {
        match (&self.master, plugin_name(path)) {
            (Some(master), Some(name)) => *master == name,
            _ => false,
        }
    }

    /// Artifacts of every configured directory, in load order
    pub async fn discover(&self) -> Result<Vec<PathBuf>, PluginSystemError> {
        let mut paths = Vec::new();
        for dir in &self.plugin_dirs {
            paths.extend(self.discover_dir(dir).await?);
        }
        Ok(paths)
    }

    /// Artifacts of one directory: regular files with the plugin extension,
    /// sorted by file name, with the master plugin moved to the front.
    pub async fn discover_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, PluginSystemError> {
        let dir_error = |source| PluginSystemError::PluginDirectory {
            path: dir.to_path_buf(),
            source,
        };

        let read_dir = fs::read_dir(dir).await.map_err(dir_error)?;
        let mut entries = ReadDirStream::new(read_dir);
        let mut paths = Vec::new();

        while let Some(entry) = entries.next().await {
            let path = entry.map_err(dir_error)?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(self.extension.as_str()) {
                continue;
            }
            // Follow symlinks; anything that is not a regular file is skipped.
            match fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => paths.push(path),
                Ok(_) => debug!("Skipping non-file plugin candidate {}", path.display()),
                Err(e) => debug!("Skipping unreadable plugin candidate {}: {}", path.display(), e),
            }
        }

        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        if let Some(pos) = paths.iter().position(|path| self.is_master(path)) {
            let master = paths.remove(pos);
            paths.insert(0, master);
        }

        debug!("Discovered {} plugin(s) in {}", paths.len(), dir.display());
        Ok(paths)
    }

    /// Load one artifact and resolve its hooks.
    ///
    /// Panics raised while the library is opened are caught and reported as a
    /// load error.
    pub fn load(&self, path: &Path) -> Result<Plugin, PluginSystemError> {
        let name = plugin_name(path).unwrap_or_else(|| path.to_string_lossy().into_owned());
        let load_error = |source: PluginSystemErrorSource| PluginSystemError::LoadError {
            plugin: name.clone(),
            path: path.to_path_buf(),
            source,
        };

        let global = self.is_master(path);
        let library = panic::catch_unwind(|| open_library(path, global))
            .map_err(|payload| load_error(PluginSystemErrorSource::Panicked(panic_message(payload.as_ref()))))?
            .map_err(|e| load_error(PluginSystemErrorSource::Library(e)))?;

        let hooks = unsafe { resolve_hooks(&library) };
        let plugin = Plugin::from_library(name, path, hooks, library);
        info!("Loaded plugin '{}' from {} (hooks: {:?})", plugin.name(), path.display(), plugin.implemented_hooks());
        Ok(plugin)
    }
}

/// Plugin name of an artifact: its file name with the extension stripped
pub fn plugin_name(path: &Path) -> Option<String> {
    path.file_stem().and_then(|stem| stem.to_str()).map(str::to_string)
}

#[cfg(unix)]
fn open_library(path: &Path, global: bool) -> Result<Library, libloading::Error> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_LOCAL, RTLD_NOW};

    let flags = if global { RTLD_NOW | RTLD_GLOBAL } else { RTLD_NOW | RTLD_LOCAL };
    unsafe { UnixLibrary::open(Some(path), flags) }.map(Library::from)
}

#[cfg(not(unix))]
fn open_library(path: &Path, _global: bool) -> Result<Library, libloading::Error> {
    unsafe { Library::new(path) }
}

/// Look up `kind`'s symbol; a missing symbol means the hook is absent.
///
/// # Safety
/// `T` must be the function pointer type the hook is exported with.
unsafe fn resolve<T: Copy>(library: &Library, kind: HookKind) -> Option<T> {
    let symbol = format!("{}\0", kind.symbol());
    unsafe { library.get::<T>(symbol.as_bytes()) }.ok().map(|sym| *sym)
}

/// # Safety
/// Exported hook symbols must have the signatures in [`abi`](crate::plugin_system::abi).
unsafe fn resolve_hooks(library: &Library) -> PluginHooks {
    let phase = |kind| -> Option<TransactionHook> {
        let raw = unsafe { resolve::<RawTransactionFn>(library, kind) }?;
        Some(Box::new(move |handle: &Handle, ctx: &TransactionContext| {
            HookError::from_status(unsafe { raw(handle, ctx) })
        }))
    };
    let handle_only = |kind| -> Option<HandleHook> {
        let raw = unsafe { resolve::<RawHandleFn>(library, kind) }?;
        Some(Box::new(move |handle: &Handle| HookError::from_status(unsafe { raw(handle) })))
    };

    let init = unsafe { resolve::<RawInitFn>(library, HookKind::Init) }.map(|raw| -> InitHook {
        Box::new(move |handle: &Handle, registrar: &mut Registrar<'_>| {
            let registrar_ptr = registrar as *mut Registrar<'_> as *mut std::ffi::c_void;
            HookError::from_status(unsafe { raw(handle, registrar_ptr) })
        })
    });
    let start = unsafe { resolve::<RawStartFn>(library, HookKind::Start) }.map(|raw| -> StartHook {
        Box::new(move |handle: &Handle, args: &[String]| {
            let raw_args = RawArgs::new(args);
            HookError::from_status(unsafe { raw(handle, raw_args.argc(), raw_args.argv()) })
        })
    });

    PluginHooks {
        init,
        start,
        exit: handle_only(HookKind::Exit),
        reset: handle_only(HookKind::Reset),
        begin: phase(HookKind::Begin),
        complete: phase(HookKind::Complete),
        end: phase(HookKind::End),
        abort: phase(HookKind::Abort),
    }
}
