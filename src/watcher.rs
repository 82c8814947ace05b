use crate::config::{PipelineConfig, StageTable, absolute};
use crate::error::WatchError;
use crate::main_loop::{RebuildRequest, notice};
use crossbeam::channel::Sender;
use notify::event::{CreateKind, RemoveKind};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Which subscription a notification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchedTree {
    Shaders,
    Templates,
}

/// Decides which notifications should trigger a rebuild.
#[derive(Debug, Clone)]
pub struct ChangeFilter {
    stages: StageTable,
    temp_suffix: String,
    excluded: Vec<PathBuf>,
}

impl ChangeFilter {
    /// Builds a filter for `config`. Generated folders are excluded so that
    /// writing outputs never re-triggers a build, whether or not they exist
    /// yet.
    pub fn new(config: &PipelineConfig) -> Self {
        let excluded = std::iter::once(&config.output_dir)
            .chain(config.processed_dir.as_ref())
            .map(|dir| absolute(dir))
            .collect();
        Self {
            stages: config.stages.clone(),
            temp_suffix: config.temp_suffix.clone(),
            excluded,
        }
    }

    /// Returns the first path of `event` that warrants a rebuild.
    ///
    /// A removed path is gone by the time the event arrives, so only the
    /// event kind can tell a folder from a file. Backends that report plain
    /// `Remove(Any)` leave that open; in the template tree such a path counts
    /// as a folder unless it has an extension. Deleting an extensionless
    /// template on those backends therefore triggers no rebuild.
    pub fn accept<'a>(&self, tree: WatchedTree, event: &'a Event) -> Option<&'a Path> {
        let unknown_removal = match event.kind {
            EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => {
                return None;
            }
            EventKind::Remove(RemoveKind::File) => false,
            EventKind::Remove(_) => true,
            EventKind::Create(_) | EventKind::Modify(_) => false,
            _ => return None,
        };

        event
            .paths
            .iter()
            .map(PathBuf::as_path)
            .filter(|path| {
                !(unknown_removal && tree == WatchedTree::Templates && path.extension().is_none())
            })
            .find(|path| self.accepts_path(tree, path))
    }

    /// Path-only part of [`ChangeFilter::accept`]: existing folders, scratch
    /// files, generated folders and (in the shader tree) unclassified files
    /// are rejected.
    pub fn accepts_path(&self, tree: WatchedTree, path: &Path) -> bool {
        if path.is_dir() {
            return false;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            return false;
        };
        if !self.temp_suffix.is_empty() && name.ends_with(self.temp_suffix.as_str()) {
            return false;
        }
        if self.excluded.iter().any(|dir| path.starts_with(dir)) {
            return false;
        }

        match tree {
            WatchedTree::Shaders => self.stages.classify(name).is_some(),
            WatchedTree::Templates => true,
        }
    }
}

/// Live subscriptions on the input and template folders.
///
/// Every accepted notification enqueues one [`RebuildRequest`]; nothing is
/// debounced or merged. Dropping the watcher ends both subscriptions.
pub struct ChangeWatcher {
    _shaders: RecommendedWatcher,
    _templates: RecommendedWatcher,
}

impl ChangeWatcher {
    /// Subscribes to both folders recursively.
    ///
    /// # Errors
    ///
    /// Returns an error if either folder cannot be watched.
    pub fn spawn(
        config: Arc<PipelineConfig>,
        sender: Sender<RebuildRequest>,
    ) -> Result<Self, WatchError> {
        let filter = Arc::new(ChangeFilter::new(&config));

        let shaders = subscribe(
            WatchedTree::Shaders,
            &config.input_dir,
            filter.clone(),
            config.clone(),
            sender.clone(),
        )?;
        let templates = subscribe(
            WatchedTree::Templates,
            &config.template_dir,
            filter,
            config.clone(),
            sender,
        )?;

        println!("Watching: {}", config.input_dir.display());
        println!("Watching: {}", config.template_dir.display());

        Ok(Self {
            _shaders: shaders,
            _templates: templates,
        })
    }
}

fn subscribe(
    tree: WatchedTree,
    dir: &Path,
    filter: Arc<ChangeFilter>,
    config: Arc<PipelineConfig>,
    sender: Sender<RebuildRequest>,
) -> Result<RecommendedWatcher, WatchError> {
    let watch_error = |source| WatchError {
        path: dir.to_path_buf(),
        source,
    };

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                let Some(path) = filter.accept(tree, &event) else {
                    return;
                };
                notice(format_args!("Change detected: {}", path.display()));
                let request = RebuildRequest {
                    config: config.clone(),
                    trigger: Some(path.to_path_buf()),
                };
                if sender.send(request).is_err() {
                    log::debug!("Main loop gone, ignoring {}", path.display());
                }
            }
            Err(e) => log::warn!("Watch error: {}", e),
        },
        Config::default(),
    )
    .map_err(watch_error)?;

    watcher
        .watch(&absolute(dir), RecursiveMode::Recursive)
        .map_err(watch_error)?;
    Ok(watcher)
}
