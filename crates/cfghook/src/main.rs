mod cli;

use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use cfghook_core::kernel::error::{Error, Result};
use cfghook_core::plugin_system::PluginManager;
use cfghook_core::{Backend, BackendConfig, ChangeSet};

use crate::cli::{CliArgs, Commands};

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
}

/// Configuration file first, command line overrides on top
fn load_config(args: &CliArgs) -> Result<BackendConfig> {
    let mut config = match &args.config {
        Some(path) => BackendConfig::load(path)?,
        None => BackendConfig::default(),
    };
    if let Some(dir) = &args.plugin_dir {
        config.backend_dir = dir.clone();
    }
    if let Some(dir) = &args.system_dir {
        config.system_dir = Some(dir.clone());
    }
    if let Some(master) = &args.master {
        config.master_plugin = Some(master.clone());
    }
    Ok(config)
}

async fn run(backend: &mut Backend, args: &[String], once: bool) -> Result<()> {
    backend.run(args).await?;
    println!("Backend started with {} plugin(s)", backend.plugin_manager().plugin_count().await);

    if !once {
        info!("Waiting for Ctrl-C...");
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| Error::Other(format!("Failed to wait for Ctrl-C: {}", e)))?;
    }
    Ok(())
}

async fn list(backend: &mut Backend) -> Result<()> {
    backend.initialize().await?;
    let plugins = backend.plugin_manager().plugin_info().await;
    if plugins.is_empty() {
        println!("No plugins loaded.");
        return Ok(());
    }

    println!("Loaded plugins:");
    for plugin in plugins {
        let location = plugin
            .path
            .as_ref()
            .map_or_else(|| "static".to_string(), |path| path.display().to_string());
        let hooks: Vec<String> = plugin.hooks.iter().map(ToString::to_string).collect();
        println!("  - {} ({})", plugin.name, location);
        println!("      hooks: {}", hooks.join(", "));
        for dep in &plugin.dependencies {
            println!("      {} {} (priority {})", dep.kind, dep.key, dep.priority);
        }
    }
    Ok(())
}

async fn commit(backend: &mut Backend, changes: &std::path::Path, validate_only: bool) -> Result<()> {
    let data = tokio::fs::read_to_string(changes)
        .await
        .map_err(|e| Error::Other(format!("Cannot read change set '{}': {}", changes.display(), e)))?;
    let change_set = ChangeSet::from_json(&data)
        .map_err(|e| Error::Other(format!("Invalid change set '{}': {}", changes.display(), e)))?;

    backend.run(&[]).await?;
    let summary = if validate_only {
        backend.validate(change_set).await?
    } else {
        backend.commit(change_set).await?
    };
    println!(
        "Transaction {} {}: {} change(s), {} callback(s)",
        summary.id, summary.state, summary.changes, summary.callbacks
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.debug);

    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let command = args.command.unwrap_or(Commands::Run {
        once: false,
        reset: false,
        args: Vec::new(),
    });
    if let Commands::Run { reset: true, .. } = command {
        config.reset_on_start = true;
    }

    let mut backend = Backend::new(config);
    let outcome = match &command {
        Commands::Run { once, args, .. } => run(&mut backend, args, *once).await,
        Commands::List => list(&mut backend).await,
        Commands::Commit { changes, validate_only } => commit(&mut backend, changes, *validate_only).await,
    };

    // Exit hooks run even when the command failed.
    let shutdown = backend.shutdown().await;
    match outcome.and(shutdown) {
        Ok(()) => {
            println!("Backend stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
