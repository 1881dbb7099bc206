mod common;

use std::path::Path;
use std::time::{Duration, Instant};

use common::{scratch_dir, TRIANGLE_GLTF};
use scene_viewer::core::SceneError;
use scene_viewer::loaders::{AssetLoader, LoadProgress, LoadResult, PendingModel, ThreadedLoader};

/// Same triangle as `TRIANGLE_GLTF`, with the buffer in a sibling file
const EXTERNAL_BUFFER_GLTF: &str = r#"{
    "asset": { "version": "2.0" },
    "scenes": [ { "nodes": [0] } ],
    "nodes": [ { "name": "triangle", "mesh": 0 } ],
    "meshes": [ { "primitives": [ { "attributes": { "POSITION": 0 } } ] } ],
    "accessors": [ {
        "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
        "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
    } ],
    "bufferViews": [ { "buffer": 0, "byteOffset": 0, "byteLength": 36 } ],
    "buffers": [ { "byteLength": 36, "uri": "triangle.bin" } ]
}"#;

fn triangle_bytes() -> Vec<u8> {
    [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect()
}

/// Poll like the frame loop does until the load settles
fn settle(pending: &mut PendingModel) -> (Vec<LoadProgress>, LoadResult) {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut progress = Vec::new();
    loop {
        progress.extend(pending.drain_progress());
        if let Some(result) = pending.try_complete() {
            progress.extend(pending.drain_progress());
            return (progress, result);
        }
        assert!(Instant::now() < deadline, "load never settled");
        std::thread::sleep(Duration::from_millis(2));
    }
}

fn write(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn test_load_reports_progress_in_chunks() {
    let dir = scratch_dir("loader-progress");
    let path = write(&dir, "triangle.gltf", TRIANGLE_GLTF.as_bytes());

    let mut pending = ThreadedLoader::with_chunk_size(128).load(&path);
    let (progress, result) = settle(&mut pending);

    let total = TRIANGLE_GLTF.len() as u64;
    assert!(progress.len() > 1);
    assert!(progress.windows(2).all(|w| w[0].loaded < w[1].loaded));
    assert_eq!(progress.last(), Some(&LoadProgress { loaded: total, total }));
    assert_eq!(progress.last().and_then(LoadProgress::percent), Some(100.0));

    let model = result.unwrap();
    assert_eq!(model.primitive_count(), 1);
}

#[test]
fn test_load_resolves_buffers_next_to_model() {
    let dir = scratch_dir("loader-external");
    write(&dir, "triangle.bin", &triangle_bytes());
    let path = write(&dir, "scene.gltf", EXTERNAL_BUFFER_GLTF.as_bytes());

    let mut pending = ThreadedLoader::default().load(&path);
    let (_, result) = settle(&mut pending);

    let model = result.unwrap();
    assert_eq!(model.meshes[0][0].geometry.positions[2], [0.0, 1.0, 0.0]);
    assert!(model.materials.is_empty());
}

#[test]
fn test_missing_buffer_file_is_load_error() {
    let dir = scratch_dir("loader-missing-buffer");
    let path = write(&dir, "scene.gltf", EXTERNAL_BUFFER_GLTF.as_bytes());

    let mut pending = ThreadedLoader::default().load(&path);
    let (_, result) = settle(&mut pending);

    assert!(matches!(result, Err(SceneError::AssetLoad { path: p, .. }) if p == path));
}

#[test]
fn test_corrupt_model_is_load_error() {
    let dir = scratch_dir("loader-corrupt");
    let path = write(&dir, "broken.gltf", b"{ \"asset\": ");

    let mut pending = ThreadedLoader::default().load(&path);
    let (_, result) = settle(&mut pending);

    let err = result.unwrap_err();
    assert!(matches!(err, SceneError::AssetLoad { .. }));
    assert!(err.to_string().contains("broken.gltf"));
}
