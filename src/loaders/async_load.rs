use futures::channel::{mpsc, oneshot};
use log::{debug, warn};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::thread;

use super::gltf::{parse_model, ModelData};
use crate::core::SceneError;

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

pub type LoadResult = Result<ModelData, SceneError>;

/// Bytes read so far out of the total, when the total is known
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u64,
    pub total: u64,
}

impl LoadProgress {
    pub fn percent(&self) -> Option<f64> {
        (self.total > 0).then(|| self.loaded as f64 / self.total as f64 * 100.0)
    }
}

/// Receiving half of a load in flight, polled from the frame thread
///
/// Dropping it abandons the load: the worker's result goes nowhere.
#[derive(Debug)]
pub struct PendingModel {
    path: PathBuf,
    progress: mpsc::UnboundedReceiver<LoadProgress>,
    result: oneshot::Receiver<LoadResult>,
}

/// Sending half held by whoever performs the load
#[derive(Debug)]
pub struct LoadReporter {
    path: PathBuf,
    progress: mpsc::UnboundedSender<LoadProgress>,
    result: oneshot::Sender<LoadResult>,
}

impl PendingModel {
    pub fn channel(path: impl Into<PathBuf>) -> (LoadReporter, PendingModel) {
        let path = path.into();
        let (progress_tx, progress_rx) = mpsc::unbounded();
        let (result_tx, result_rx) = oneshot::channel();
        (
            LoadReporter {
                path: path.clone(),
                progress: progress_tx,
                result: result_tx,
            },
            PendingModel {
                path,
                progress: progress_rx,
                result: result_rx,
            },
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Progress updates received since the last call
    pub fn drain_progress(&mut self) -> Vec<LoadProgress> {
        let mut updates = Vec::new();
        while let Ok(Some(update)) = self.progress.try_next() {
            updates.push(update);
        }
        updates
    }

    /// Non-blocking check for the final result
    pub fn try_complete(&mut self) -> Option<LoadResult> {
        match self.result.try_recv() {
            Ok(result) => result,
            Err(oneshot::Canceled) => Some(Err(SceneError::AssetLoad {
                path: self.path.clone(),
                reason: "loader stopped without a result".to_string(),
            })),
        }
    }
}

impl LoadReporter {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn progress(&self, loaded: u64, total: u64) {
        // Receiver gone means the scene was unmounted; nothing to tell
        let _ = self.progress.unbounded_send(LoadProgress { loaded, total });
    }

    /// True once the `PendingModel` has been dropped
    pub fn is_abandoned(&self) -> bool {
        self.result.is_canceled()
    }

    pub fn finish(self, result: LoadResult) {
        if self.result.send(result).is_err() {
            debug!("Load of {:?} finished after its scene went away", self.path);
        }
    }

    pub fn fail(self, reason: impl Into<String>) {
        let path = self.path.clone();
        self.finish(Err(SceneError::AssetLoad {
            path,
            reason: reason.into(),
        }));
    }
}

/// Starts model loads without blocking the caller
pub trait AssetLoader {
    fn load(&self, path: &Path) -> PendingModel;
}

/// Reads and parses models on a worker thread
#[derive(Debug, Clone)]
pub struct ThreadedLoader {
    chunk_size: usize,
}

impl Default for ThreadedLoader {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ThreadedLoader {
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
}

impl AssetLoader for ThreadedLoader {
    fn load(&self, path: &Path) -> PendingModel {
        let (reporter, pending) = PendingModel::channel(path);
        let chunk_size = self.chunk_size;

        let spawned = thread::Builder::new()
            .name("model-loader".to_string())
            .spawn(move || load_blocking(reporter, chunk_size));
        if let Err(e) = spawned {
            // The reporter moved into the closure and was dropped with it,
            // so the pending side resolves to a cancellation error.
            warn!("Failed to spawn loader thread: {}", e);
        }
        pending
    }
}

fn load_blocking(reporter: LoadReporter, chunk_size: usize) {
    let path = reporter.path().to_path_buf();

    let mut file = match File::open(&path) {
        Ok(file) => file,
        Err(e) => return reporter.fail(format!("cannot open: {}", e)),
    };
    let total = file.metadata().map(|m| m.len()).unwrap_or(0);

    let mut bytes = Vec::with_capacity(total as usize);
    let mut chunk = vec![0u8; chunk_size];
    loop {
        if reporter.is_abandoned() {
            debug!("Abandoning load of {:?}", path);
            return;
        }
        match file.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                bytes.extend_from_slice(&chunk[..n]);
                reporter.progress(bytes.len() as u64, total);
            }
            Err(e) => return reporter.fail(format!("read failed: {}", e)),
        }
    }

    match parse_model(&bytes, path.parent()) {
        Ok(model) => reporter.finish(Ok(model)),
        Err(e) => reporter.fail(format!("{:#}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait(pending: &mut PendingModel) -> LoadResult {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(result) = pending.try_complete() {
                return result;
            }
            assert!(Instant::now() < deadline, "load timed out");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_percent() {
        assert_eq!(LoadProgress { loaded: 50, total: 200 }.percent(), Some(25.0));
        assert_eq!(LoadProgress { loaded: 50, total: 0 }.percent(), None);
    }

    #[test]
    fn test_manual_channel_delivers_progress_then_result() {
        let (reporter, mut pending) = PendingModel::channel("model.gltf");
        assert!(pending.try_complete().is_none());

        reporter.progress(10, 100);
        reporter.progress(100, 100);
        assert_eq!(pending.drain_progress().len(), 2);
        assert!(pending.drain_progress().is_empty());

        reporter.finish(Ok(ModelData::default()));
        assert_eq!(pending.try_complete(), Some(Ok(ModelData::default())));
    }

    #[test]
    fn test_dropped_reporter_is_an_error() {
        let (reporter, mut pending) = PendingModel::channel("model.gltf");
        drop(reporter);
        assert!(matches!(pending.try_complete(), Some(Err(SceneError::AssetLoad { .. }))));
    }

    #[test]
    fn test_dropped_pending_abandons() {
        let (reporter, pending) = PendingModel::channel("model.gltf");
        assert!(!reporter.is_abandoned());
        drop(pending);
        assert!(reporter.is_abandoned());
        reporter.finish(Ok(ModelData::default()));
    }

    #[test]
    fn test_missing_file_fails() {
        let loader = ThreadedLoader::default();
        let mut pending = loader.load(Path::new("/nonexistent/models/none.gltf"));
        match wait(&mut pending) {
            Err(SceneError::AssetLoad { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/models/none.gltf"));
            }
            other => panic!("expected load error, got {:?}", other),
        }
    }

    #[test]
    fn test_loads_file_with_progress() {
        let dir = std::env::temp_dir().join(format!("scene-viewer-load-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("triangle.gltf");
        std::fs::write(&path, super::super::gltf::tests::TRIANGLE_GLTF).unwrap();

        let loader = ThreadedLoader::with_chunk_size(64);
        let mut pending = loader.load(&path);
        let model = wait(&mut pending).unwrap();
        let progress = pending.drain_progress();

        assert_eq!(model.nodes.len(), 2);
        assert!(progress.len() > 1);
        let last = progress.last().unwrap();
        assert_eq!(last.loaded, last.total);

        std::fs::remove_dir_all(&dir).ok();
    }
}
