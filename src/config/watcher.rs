//! Configuration file watcher for hot-reload support
//!
//! Editing the config while the surface runs can move the active bank. Held
//! buttons keep their latched address, so the reload is safe mid-gesture.

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::AppConfig;

/// Delay before re-reading a modified file, lets editors finish writing
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(100);

/// Config watcher that monitors file changes and delivers reloaded configs
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<AppConfig>,
}

impl ConfigWatcher {
    /// Load the config at `path` and start watching it
    pub async fn new(path: impl Into<PathBuf>) -> Result<(Self, AppConfig)> {
        let path: PathBuf = path.into();
        let path_str = path.to_string_lossy().to_string();

        let initial = AppConfig::load(&path_str)
            .await
            .context("Failed to load initial config")?;

        let (tx, rx) = mpsc::channel(10);

        // notify callbacks run on their own OS thread, not in Tokio context
        let runtime = tokio::runtime::Handle::current();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    error!("Watch error: {}", e);
                    return;
                }
            };
            if !matches!(event.kind, EventKind::Modify(_)) {
                return;
            }
            debug!("Config file modified: {:?}", event.paths);

            let path = path_str.clone();
            let tx = tx.clone();
            runtime.spawn(async move {
                tokio::time::sleep(RELOAD_DEBOUNCE).await;

                match AppConfig::load(&path).await {
                    Ok(config) => {
                        info!("Configuration reloaded: {}", path);
                        if let Err(e) = tx.send(config).await {
                            error!("Failed to send config update: {}", e);
                        }
                    }
                    Err(e) => warn!("Failed to reload config (keeping old config): {:#}", e),
                }
            });
        })?;

        watcher
            .watch(Path::new(&path), RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch config file: {}", path.display()))?;

        info!("Config file watcher started for: {}", path.display());

        Ok((
            Self {
                _watcher: watcher,
                rx,
            },
            initial,
        ))
    }

    /// Wait for the next config update
    /// Returns None if the watcher has been closed
    pub async fn next_config(&mut self) -> Option<AppConfig> {
        self.rx.recv().await
    }
}
