#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use scene_viewer::core::{
    FrameRequest, FrameScheduler, GeometryId, ListenerId, MaterialDesc, MaterialId, MountPoint, Overlay,
    RenderBackend, RenderFrame, ResizeEvents, ResourceId, Result, SceneError, SceneMount, SurfaceId, SurfaceNode,
    SurfaceOptions, TextureData, TextureId, Viewport,
};
use scene_viewer::loaders::{AssetLoader, LoadReporter, PendingModel};
use scene_viewer::scene::GeometryData;

pub const FRAME_DELTA: f32 = 1.0 / 60.0;

/// One red triangle under a translated parent node, buffer inlined
pub const TRIANGLE_GLTF: &str = r#"{
    "asset": { "version": "2.0" },
    "scene": 0,
    "scenes": [ { "nodes": [0] } ],
    "nodes": [
        { "name": "parent", "translation": [0.0, 0.0, 5.0], "children": [1] },
        { "name": "triangle", "mesh": 0 }
    ],
    "meshes": [ { "primitives": [ { "attributes": { "POSITION": 0 }, "material": 0 } ] } ],
    "materials": [ { "pbrMetallicRoughness": { "baseColorFactor": [1.0, 0.0, 0.0, 1.0] } } ],
    "accessors": [ {
        "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
        "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
    } ],
    "bufferViews": [ { "buffer": 0, "byteOffset": 0, "byteLength": 36 } ],
    "buffers": [ {
        "byteLength": 36,
        "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"
    } ]
}"#;

// ============================================================================
// Host
// ============================================================================

/// In-memory mount point with a manually fired frame queue
#[derive(Debug, Default)]
pub struct FakeHost {
    pub size: (u32, u32),
    pub nodes: Vec<SurfaceNode>,
    pub pending: BTreeSet<FrameRequest>,
    pub listeners: Vec<ListenerId>,
    pub fail_append: bool,
    pub fail_listener_removal: bool,
    next_id: u64,
}

impl FakeHost {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            ..Default::default()
        }
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Deliver the oldest pending frame callback
    pub fn fire_frame(&mut self) -> Option<FrameRequest> {
        self.pending.pop_first()
    }

    /// True when nothing the mount acquired is still registered
    pub fn is_clean(&self) -> bool {
        self.nodes.is_empty() && self.pending.is_empty() && self.listeners.is_empty()
    }
}

impl MountPoint for FakeHost {
    fn client_size(&self) -> (u32, u32) {
        self.size
    }

    fn append_surface(&mut self, _surface: SurfaceId) -> Result<SurfaceNode> {
        if self.fail_append {
            return Err(SceneError::Host("mount point is detached".to_string()));
        }
        let node = SurfaceNode(self.next());
        self.nodes.push(node);
        Ok(node)
    }

    fn remove_surface(&mut self, node: SurfaceNode) -> Result<()> {
        let before = self.nodes.len();
        self.nodes.retain(|n| *n != node);
        if self.nodes.len() == before {
            return Err(SceneError::Host("node not attached".to_string()));
        }
        Ok(())
    }
}

impl FrameScheduler for FakeHost {
    fn request_frame(&mut self) -> FrameRequest {
        let request = FrameRequest(self.next());
        self.pending.insert(request);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        self.pending.remove(&request);
    }
}

impl ResizeEvents for FakeHost {
    fn add_resize_listener(&mut self) -> ListenerId {
        let listener = ListenerId(self.next());
        self.listeners.push(listener);
        listener
    }

    fn remove_resize_listener(&mut self, listener: ListenerId) -> Result<()> {
        if self.fail_listener_removal {
            return Err(SceneError::Host("listener registry locked".to_string()));
        }
        self.listeners.retain(|l| *l != listener);
        Ok(())
    }
}

// ============================================================================
// Backend
// ============================================================================

/// Backend that tracks live allocations instead of touching a GPU
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub live: HashSet<ResourceId>,
    pub surface_sizes: HashMap<SurfaceId, Viewport>,
    pub colors: HashMap<MaterialId, [f32; 4]>,
    pub renders: usize,
    pub last_overlays: Vec<Overlay>,
    pub fail_geometry_disposal: bool,
    pub fail_surface_resize: bool,
    next_id: u64,
}

impl RecordingBackend {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl RenderBackend for RecordingBackend {
    fn create_surface(&mut self, viewport: Viewport, _options: &SurfaceOptions) -> Result<SurfaceId> {
        let id = SurfaceId(self.next());
        self.live.insert(ResourceId::Surface(id));
        self.surface_sizes.insert(id, viewport);
        Ok(id)
    }

    fn resize_surface(&mut self, surface: SurfaceId, viewport: Viewport) -> Result<()> {
        if self.fail_surface_resize {
            return Err(SceneError::Surface("swap chain lost".to_string()));
        }
        if !self.live.contains(&ResourceId::Surface(surface)) {
            return Err(SceneError::UnknownResource(ResourceId::Surface(surface)));
        }
        self.surface_sizes.insert(surface, viewport);
        Ok(())
    }

    fn create_geometry(&mut self, _data: &GeometryData) -> Result<GeometryId> {
        let id = GeometryId(self.next());
        self.live.insert(ResourceId::Geometry(id));
        Ok(id)
    }

    fn create_material(&mut self, desc: &MaterialDesc) -> Result<MaterialId> {
        let id = MaterialId(self.next());
        self.live.insert(ResourceId::Material(id));
        self.colors.insert(id, desc.base_color);
        Ok(id)
    }

    fn create_texture(&mut self, _data: &TextureData) -> Result<TextureId> {
        let id = TextureId(self.next());
        self.live.insert(ResourceId::Texture(id));
        Ok(id)
    }

    fn set_material_color(&mut self, material: MaterialId, color: [f32; 4]) -> Result<()> {
        if !self.live.contains(&ResourceId::Material(material)) {
            return Err(SceneError::UnknownResource(ResourceId::Material(material)));
        }
        self.colors.insert(material, color);
        Ok(())
    }

    fn render(&mut self, surface: SurfaceId, frame: &RenderFrame<'_>) -> Result<()> {
        if !self.live.contains(&ResourceId::Surface(surface)) {
            return Err(SceneError::UnknownResource(ResourceId::Surface(surface)));
        }
        self.renders += 1;
        self.last_overlays = frame.overlays.to_vec();
        Ok(())
    }

    fn dispose(&mut self, resource: ResourceId) -> Result<()> {
        if self.fail_geometry_disposal && matches!(resource, ResourceId::Geometry(_)) {
            return Err(SceneError::Host("geometry still bound".to_string()));
        }
        if self.live.remove(&resource) {
            Ok(())
        } else {
            Err(SceneError::UnknownResource(resource))
        }
    }
}

// ============================================================================
// Loader
// ============================================================================

/// Loader whose loads settle only when the test says so
#[derive(Debug, Default)]
pub struct ManualLoader {
    pub requested: RefCell<Vec<PathBuf>>,
    reporters: RefCell<Vec<LoadReporter>>,
}

impl ManualLoader {
    pub fn take_reporter(&self) -> Option<LoadReporter> {
        self.reporters.borrow_mut().pop()
    }
}

impl AssetLoader for ManualLoader {
    fn load(&self, path: &Path) -> PendingModel {
        self.requested.borrow_mut().push(path.to_path_buf());
        let (reporter, pending) = PendingModel::channel(path);
        self.reporters.borrow_mut().push(reporter);
        pending
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn viewport(width: u32, height: u32) -> Viewport {
    Viewport::new(width, height).unwrap()
}

/// Fire `frames` host callbacks, returning how many the mount accepted
pub fn run_frames(mount: &mut SceneMount, host: &mut FakeHost, backend: &mut RecordingBackend, frames: usize) -> usize {
    let mut accepted = 0;
    for _ in 0..frames {
        let Some(request) = host.fire_frame() else {
            break;
        };
        if mount.tick(host, backend, request, FRAME_DELTA).is_some() {
            accepted += 1;
        }
    }
    accepted
}

/// Fresh scratch directory for one test
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("scene-viewer-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
