//! Watching spec and bug directories for changes
//!
//! The [`Supervisor`] owns at most one active [`ItemWatcher`]. Whoever
//! composes the application holds the supervisor and starts or stops it
//! explicitly; subscribers keep their receiver across restarts.

use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind, Debouncer};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::sync::broadcast;

use crate::git::paths::{ItemKind, KIRO_DIR};

/// Events emitted by the item watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemEvent {
    /// Files of one item changed
    Changed {
        kind: ItemKind,
        name: String,
        paths: Vec<PathBuf>,
    },
    /// The underlying watcher reported an error
    Error(String),
}

/// Configuration for item watching
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Tree whose `.kiro/specs` and `.kiro/bugs` are watched
    pub project_root: PathBuf,
    /// Debounce duration in milliseconds
    pub debounce_ms: u64,
    /// Ignore patterns, matched against paths relative to the item directory
    pub ignore_patterns: Vec<String>,
}

impl WatchConfig {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            debounce_ms: 500,
            ignore_patterns: vec!["logs/**".to_string(), "*.tmp".to_string(), "*.swp".to_string()],
        }
    }

    pub fn with_debounce(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    pub fn with_ignore(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    fn is_ignored(&self, relative: &Path) -> bool {
        let path_str = relative.to_string_lossy();
        self.ignore_patterns.iter().any(|ignore| {
            glob::Pattern::new(ignore)
                .map(|pattern| pattern.matches(&path_str))
                .unwrap_or(false)
        })
    }

    /// Map a changed path to the item it belongs to
    ///
    /// Returns `None` for paths outside `.kiro/{specs,bugs}/{name}/` and for
    /// ignored files.
    fn item_for(&self, path: &Path) -> Option<(ItemKind, String)> {
        let relative = path.strip_prefix(&self.project_root).ok()?;
        let mut components = relative.components().filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        });

        if components.next()? != KIRO_DIR {
            return None;
        }
        let kind = match components.next()?.as_str() {
            "specs" => ItemKind::Spec,
            "bugs" => ItemKind::Bug,
            _ => return None,
        };
        let name = components.next()?;

        let inside: PathBuf = components.collect();
        if self.is_ignored(&inside) {
            return None;
        }

        Some((kind, name))
    }
}

/// A running watcher; dropping it stops watching
pub struct ItemWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
    watched: Vec<PathBuf>,
}

impl ItemWatcher {
    /// Start watching, publishing events on `events`
    pub fn start(config: WatchConfig, events: broadcast::Sender<ItemEvent>) -> Result<Self> {
        let handler_config = config.clone();
        let handler_events = events.clone();

        let mut debouncer = new_debouncer(
            Duration::from_millis(config.debounce_ms),
            move |result: notify_debouncer_mini::DebounceEventResult| match result {
                Ok(debounced) => {
                    let mut changed: BTreeMap<(ItemKind, String), Vec<PathBuf>> = BTreeMap::new();
                    for event in debounced {
                        if !matches!(event.kind, DebouncedEventKind::Any) {
                            continue;
                        }
                        if let Some(key) = handler_config.item_for(&event.path) {
                            changed.entry(key).or_default().push(event.path);
                        }
                    }

                    for ((kind, name), paths) in changed {
                        tracing::debug!("{} {} changed: {:?}", kind, name, paths);
                        let _ = handler_events.send(ItemEvent::Changed { kind, name, paths });
                    }
                }
                Err(error) => {
                    tracing::error!("Watch error: {:?}", error);
                    let _ = handler_events.send(ItemEvent::Error(format!("{:?}", error)));
                }
            },
        )
        .context("Failed to create file watcher")?;

        let mut watched = Vec::new();
        for kind in [ItemKind::Spec, ItemKind::Bug] {
            let dir = config.project_root.join(KIRO_DIR).join(kind.items_dir());
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            debouncer
                .watcher()
                .watch(&dir, RecursiveMode::Recursive)
                .with_context(|| format!("Failed to watch directory: {}", dir.display()))?;
            watched.push(dir);
        }

        tracing::info!("Watching {:?} for item changes", watched);

        Ok(Self {
            _debouncer: debouncer,
            watched,
        })
    }

    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }
}

/// Owner of the single active item watcher
pub struct Supervisor {
    current: Option<ItemWatcher>,
    events: broadcast::Sender<ItemEvent>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(100);
        Self {
            current: None,
            events,
        }
    }

    /// Start watching, replacing a watcher that is already running
    pub fn start(&mut self, config: WatchConfig) -> Result<()> {
        if self.stop() {
            tracing::debug!("Replaced running item watcher");
        }
        self.current = Some(ItemWatcher::start(config, self.events.clone())?);
        Ok(())
    }

    /// Stop the running watcher; returns whether one was running
    pub fn stop(&mut self) -> bool {
        self.current.take().is_some()
    }

    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    pub fn watched(&self) -> &[PathBuf] {
        self.current.as_ref().map(ItemWatcher::watched).unwrap_or(&[])
    }

    /// Subscribe to item events; the receiver survives restarts
    pub fn subscribe(&self) -> broadcast::Receiver<ItemEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_item_for_path() {
        let config = WatchConfig::new("/work/app");

        assert_eq!(
            config.item_for(Path::new("/work/app/.kiro/specs/auth/requirements.md")),
            Some((ItemKind::Spec, "auth".to_string()))
        );
        assert_eq!(
            config.item_for(Path::new("/work/app/.kiro/bugs/crash/bug.json")),
            Some((ItemKind::Bug, "crash".to_string()))
        );
        assert_eq!(config.item_for(Path::new("/work/app/.kiro/steering/tech.md")), None);
        assert_eq!(config.item_for(Path::new("/work/app/src/main.rs")), None);
        assert_eq!(config.item_for(Path::new("/elsewhere/.kiro/specs/a/b.md")), None);
    }

    #[test]
    fn test_ignore_patterns() {
        let config = WatchConfig::new("/work/app");

        assert_eq!(config.item_for(Path::new("/work/app/.kiro/specs/a/logs/agent.log")), None);
        assert_eq!(config.item_for(Path::new("/work/app/.kiro/specs/a/draft.tmp")), None);

        let config = config.with_ignore(vec![]);
        assert!(config.item_for(Path::new("/work/app/.kiro/specs/a/draft.tmp")).is_some());
    }

    #[test]
    fn test_watch_config_builder() {
        let config = WatchConfig::new("/tmp/app").with_debounce(1000);
        assert_eq!(config.debounce_ms, 1000);
        assert_eq!(config.project_root, PathBuf::from("/tmp/app"));
    }

    #[tokio::test]
    async fn test_supervisor_holds_one_watcher() {
        let temp_dir = TempDir::new().unwrap();
        let mut supervisor = Supervisor::new();
        assert!(!supervisor.is_running());
        assert!(!supervisor.stop());

        supervisor.start(WatchConfig::new(temp_dir.path())).unwrap();
        assert!(supervisor.is_running());
        assert_eq!(supervisor.watched().len(), 2);

        supervisor.start(WatchConfig::new(temp_dir.path())).unwrap();
        assert!(supervisor.is_running());

        assert!(supervisor.stop());
        assert!(!supervisor.is_running());
        assert!(supervisor.watched().is_empty());
    }

    #[tokio::test]
    async fn test_supervisor_reports_item_changes() {
        let temp_dir = TempDir::new().unwrap();
        let mut supervisor = Supervisor::new();
        let mut events = supervisor.subscribe();

        supervisor
            .start(WatchConfig::new(temp_dir.path()).with_debounce(50))
            .unwrap();

        let item = temp_dir.path().join(".kiro/bugs/crash");
        std::fs::create_dir_all(&item).unwrap();
        std::fs::write(item.join("bug.json"), "{}").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                match events.recv().await {
                    Ok(ItemEvent::Changed { kind, name, .. }) => break (kind, name),
                    Ok(ItemEvent::Error(_)) => continue,
                    Err(e) => panic!("event channel closed: {e}"),
                }
            }
        })
        .await
        .expect("no change event within timeout");

        assert_eq!(event, (ItemKind::Bug, "crash".to_string()));
    }
}
