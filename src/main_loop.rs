//! The compiler-owning loop.
//!
//! Change notifications arrive on watcher threads and are only ever queued.
//! One thread acquires the compiler, runs the initial build and then runs one
//! build per queued request, each to completion before the next is taken.

use crate::compile::{CompileError, CompilerOracle};
use crate::config::PipelineConfig;
use crate::error::{BuildError, RunError, WatchError};
use crate::pipeline::{BuildReport, run_build};
use crate::queue::EventQueue;
use crate::watcher::ChangeWatcher;
use crossbeam::channel::Sender;
use parking_lot::Mutex;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A request to rebuild everything with the given configuration.
#[derive(Debug, Clone)]
pub struct RebuildRequest {
    pub config: Arc<PipelineConfig>,
    /// The changed path, `None` for the initial build.
    pub trigger: Option<PathBuf>,
}

/// Prints a timestamped one-line notice.
pub(crate) fn notice(message: fmt::Arguments<'_>) {
    println!("[{}] {}", chrono::Local::now().format("%H:%M:%S"), message);
}

/// Stops watching and ends the loop from any thread.
///
/// Subscriptions are dropped first, then the loop is told to stop. A build
/// that is already running finishes; requests still queued are discarded.
#[derive(Clone)]
pub struct ShutdownHandle {
    watcher: Arc<Mutex<Option<ChangeWatcher>>>,
    stop: Sender<()>,
}

impl ShutdownHandle {
    /// Hands over a watcher to be stopped on shutdown. Replaces (and stops) any
    /// previously attached one.
    pub fn attach(&self, watcher: ChangeWatcher) {
        *self.watcher.lock() = Some(watcher);
    }

    pub fn request(&self) {
        if self.watcher.lock().take().is_some() {
            log::info!("Stopped watching for changes");
        }
        // Fails only when the loop has already returned.
        let _ = self.stop.send(());
    }

    /// Whether a watcher is still attached.
    pub fn is_watching(&self) -> bool {
        self.watcher.lock().is_some()
    }
}

/// Drains rebuild requests on the thread that owns the compiler.
pub struct MainLoop {
    config: Arc<PipelineConfig>,
    queue: EventQueue<RebuildRequest>,
    shutdown: ShutdownHandle,
}

impl MainLoop {
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        let queue = EventQueue::new();
        let shutdown = ShutdownHandle {
            watcher: Arc::new(Mutex::new(None)),
            stop: queue.stopper(),
        };
        Self {
            config,
            queue,
            shutdown,
        }
    }

    /// Producer handle for rebuild requests.
    pub fn sender(&self) -> Sender<RebuildRequest> {
        self.queue.sender()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn config(&self) -> &Arc<PipelineConfig> {
        &self.config
    }

    /// Subscribes to the input and template folders. The subscriptions end on
    /// [`ShutdownHandle::request`].
    ///
    /// # Errors
    ///
    /// Returns an error if either folder cannot be watched.
    pub fn watch(&self) -> Result<(), WatchError> {
        let watcher = ChangeWatcher::spawn(self.config.clone(), self.sender())?;
        self.shutdown.attach(watcher);
        Ok(())
    }

    /// Acquires the compiler on the calling thread, runs the initial build and
    /// then one build per request until shut down.
    ///
    /// Build failures are passed to `on_build` and never end the loop. The
    /// compiler is released before returning. Returns the number of builds run.
    ///
    /// # Errors
    ///
    /// Returns an error only if the compiler cannot be acquired, in which case
    /// no build runs.
    pub fn run<O, A, F>(self, acquire: A, mut on_build: F) -> Result<usize, CompileError>
    where
        O: CompilerOracle,
        A: FnOnce() -> Result<O, CompileError>,
        F: FnMut(&RebuildRequest, &Result<BuildReport, BuildError>),
    {
        let mut oracle = acquire()?;
        log::info!("Compiler context acquired");

        let initial = RebuildRequest {
            config: self.config.clone(),
            trigger: None,
        };
        build_once(&mut oracle, &initial, &mut on_build);
        let mut builds = 1;

        while let Some(request) = self.queue.recv() {
            build_once(&mut oracle, &request, &mut on_build);
            builds += 1;
        }

        let discarded = self.queue.discard_pending();
        if discarded > 0 {
            log::info!("Discarded {} pending rebuild requests", discarded);
        }

        drop(oracle);
        log::info!("Compiler context released after {} builds", builds);
        Ok(builds)
    }
}

fn build_once<O, F>(oracle: &mut O, request: &RebuildRequest, on_build: &mut F)
where
    O: CompilerOracle,
    F: FnMut(&RebuildRequest, &Result<BuildReport, BuildError>),
{
    let result = run_build(&request.config, oracle);
    match &result {
        Ok(report) => {
            let failed = report.failed_outputs().count();
            if failed == 0 {
                notice(format_args!("Rebuild complete: {} outputs", report.outputs.len()));
            } else {
                notice(format_args!(
                    "Rebuild complete: {} outputs, {} failed",
                    report.outputs.len(),
                    failed
                ));
            }
        }
        Err(e) => {
            log::error!("Build failed: {}", e);
            notice(format_args!("Rebuild failed"));
        }
    }
    on_build(request, &result);
}

/// Runs a single build with a freshly acquired compiler.
///
/// # Errors
///
/// Returns an error if the compiler cannot be acquired or the build fails.
pub fn run_once<O, A>(config: &PipelineConfig, acquire: A) -> Result<BuildReport, RunError>
where
    O: CompilerOracle,
    A: FnOnce() -> Result<O, CompileError>,
{
    let mut oracle = acquire().map_err(RunError::Acquire)?;
    Ok(run_build(config, &mut oracle)?)
}
