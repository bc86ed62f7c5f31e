//! Tileset probing: read a sheet's pixel size off the main thread and slice it
//!
//! Probes run on Bevy's [`IoTaskPool`]. Requests for the same image share one
//! task and one cached result, failures included, until [`TilesetProber::forget`].

use bevy::log::{info, warn};
use bevy::tasks::{block_on, futures_lite::future, IoTaskPool, Task, TaskPool};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tilecraft_core::{TilesetDefinition, TilesetError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("failed to read image '{path}': {message}")]
    Decode { path: String, message: String },
    #[error("tile size must be greater than zero")]
    ZeroTileSize,
    #[error("probe of '{path}' timed out after {after_ms}ms")]
    TimedOut { path: String, after_ms: u64 },
    #[error("probe task for '{0}' was dropped")]
    TaskDropped(String),
}

impl From<TilesetError> for ProbeError {
    fn from(e: TilesetError) -> Self {
        match e {
            TilesetError::ZeroTileSize => ProbeError::ZeroTileSize,
        }
    }
}

/// Where probed images come from
pub trait ImageSource: Send + Sync + 'static {
    /// Pixel `(width, height)` of the image at `path`
    fn dimensions(&self, path: &str) -> Result<(u32, u32), ProbeError>;
}

/// Reads image headers from disk, relative to an assets root
#[derive(Debug, Clone)]
pub struct FileImageSource {
    root: PathBuf,
}

impl FileImageSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ImageSource for FileImageSource {
    fn dimensions(&self, path: &str) -> Result<(u32, u32), ProbeError> {
        image::image_dimensions(self.root.join(path)).map_err(|e| ProbeError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

/// Read an image's size and derive its slicing grid
pub async fn probe_tileset(
    source: &dyn ImageSource,
    path: &str,
    tile_size: u32,
) -> Result<TilesetDefinition, ProbeError> {
    if tile_size == 0 {
        return Err(ProbeError::ZeroTileSize);
    }
    let (width, height) = source.dimensions(path)?;
    Ok(TilesetDefinition::from_dimensions(
        path, width, height, tile_size,
    )?)
}

/// Where a probe currently stands
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeStatus {
    Pending,
    Ready(TilesetDefinition),
    Failed(ProbeError),
}

/// A probe that finished since the last [`TilesetProber::poll`]
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeEvent {
    Ready(TilesetDefinition),
    Failed { path: String, error: ProbeError },
}

struct InFlight {
    task: Task<Result<TilesetDefinition, ProbeError>>,
    started: Instant,
    /// Tile size of the latest request; the result is sliced to it
    tile_size: u32,
}

/// Memoizing, coalescing tileset prober
pub struct TilesetProber {
    source: Arc<dyn ImageSource>,
    timeout: Duration,
    in_flight: HashMap<String, InFlight>,
    cache: HashMap<String, Result<TilesetDefinition, ProbeError>>,
    events: Vec<ProbeEvent>,
}

impl TilesetProber {
    pub fn new(source: Arc<dyn ImageSource>, timeout: Duration) -> Self {
        IoTaskPool::get_or_init(TaskPool::new);
        Self {
            source,
            timeout,
            in_flight: HashMap::new(),
            cache: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// Ask for the slicing of an image, starting a probe if none is cached or running.
    ///
    /// A cached result for another tile size is re-sliced without touching the image.
    /// Asking again with another size while a probe runs makes the result land
    /// sliced to the newest size.
    pub fn request(&mut self, path: &str, tile_size: u32) -> ProbeStatus {
        match self.cache.get(path) {
            Some(Ok(def)) if def.tile_size == tile_size => return ProbeStatus::Ready(def.clone()),
            Some(Ok(def)) => {
                let resliced = TilesetDefinition::from_dimensions(
                    path,
                    def.image_width,
                    def.image_height,
                    tile_size,
                )
                .map_err(ProbeError::from);
                self.cache.insert(path.to_string(), resliced.clone());
                return resliced.into();
            }
            Some(Err(e)) => return ProbeStatus::Failed(e.clone()),
            None => {}
        }

        if let Some(in_flight) = self.in_flight.get_mut(path) {
            in_flight.tile_size = tile_size;
        } else {
            let source = Arc::clone(&self.source);
            let owned = path.to_string();
            let task = IoTaskPool::get()
                .spawn(async move { probe_tileset(source.as_ref(), &owned, tile_size).await });
            self.in_flight.insert(
                path.to_string(),
                InFlight {
                    task,
                    started: Instant::now(),
                    tile_size,
                },
            );
        }
        ProbeStatus::Pending
    }

    /// Current state of a path, `None` if it was never requested
    pub fn status(&self, path: &str) -> Option<ProbeStatus> {
        if self.in_flight.contains_key(path) {
            return Some(ProbeStatus::Pending);
        }
        self.cache.get(path).cloned().map(ProbeStatus::from)
    }

    /// Collect finished probes and return what happened since the last call
    pub fn poll(&mut self) -> Vec<ProbeEvent> {
        self.collect();
        std::mem::take(&mut self.events)
    }

    /// Block until the probe for `path` finishes or times out.
    ///
    /// Events it collects are kept for the next [`poll`](Self::poll).
    pub fn wait(&mut self, path: &str) -> Option<ProbeStatus> {
        while self.in_flight.contains_key(path) {
            self.collect();
            if self.in_flight.contains_key(path) {
                std::thread::sleep(Duration::from_millis(2));
            }
        }
        self.status(path)
    }

    /// Drop any cached or running probe for `path` so it can be retried.
    ///
    /// Cancelling a running probe reports it as dropped on the next poll.
    pub fn forget(&mut self, path: &str) -> bool {
        let cached = self.cache.remove(path).is_some();
        let running = self.in_flight.remove(path).is_some();
        if running {
            self.events.push(ProbeEvent::Failed {
                path: path.to_string(),
                error: ProbeError::TaskDropped(path.to_string()),
            });
        }
        cached || running
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    fn collect(&mut self) {
        let mut finished = Vec::new();
        for (path, in_flight) in &mut self.in_flight {
            if let Some(result) = block_on(future::poll_once(&mut in_flight.task)) {
                let result = match result {
                    Ok(def) if def.tile_size != in_flight.tile_size => {
                        TilesetDefinition::from_dimensions(
                            path,
                            def.image_width,
                            def.image_height,
                            in_flight.tile_size,
                        )
                        .map_err(ProbeError::from)
                    }
                    other => other,
                };
                finished.push((path.clone(), result));
            } else if in_flight.started.elapsed() >= self.timeout {
                finished.push((
                    path.clone(),
                    Err(ProbeError::TimedOut {
                        path: path.clone(),
                        after_ms: self.timeout.as_millis() as u64,
                    }),
                ));
            }
        }

        for (path, result) in finished {
            // Dropping the task cancels it if it is still running
            self.in_flight.remove(&path);
            match &result {
                Ok(def) => {
                    info!(
                        "Detected tileset {}: {}x{} px, {}x{} tiles of {}px",
                        path, def.image_width, def.image_height, def.columns, def.rows, def.tile_size
                    );
                    self.events.push(ProbeEvent::Ready(def.clone()));
                }
                Err(error) => {
                    warn!("Failed to probe tileset {}: {}", path, error);
                    self.events.push(ProbeEvent::Failed {
                        path: path.clone(),
                        error: error.clone(),
                    });
                }
            }
            self.cache.insert(path, result);
        }
    }
}

impl From<Result<TilesetDefinition, ProbeError>> for ProbeStatus {
    fn from(result: Result<TilesetDefinition, ProbeError>) -> Self {
        match result {
            Ok(def) => ProbeStatus::Ready(def),
            Err(e) => ProbeStatus::Failed(e),
        }
    }
}
