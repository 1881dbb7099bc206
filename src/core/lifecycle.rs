//! Scene mount lifecycle.
//!
//! `SceneMount::mount` assembles a scene, attaches its surface to the
//! host, subscribes to resize notifications and starts the animation
//! loop. `SceneMount::unmount` undoes all of it in a fixed order and
//! keeps going when a step fails, so a mount/unmount pair never leaks a
//! frame request, a listener, a surface node or a GPU allocation.

use glam::Vec2;
use log::{debug, error, info, warn};

use super::animation::AnimationLoop;
use super::backend::{Overlay, RenderBackend, RenderFrame, ResourceId};
use super::error::{Result, SceneError};
use super::host::{CursorHint, FrameRequest, Host, ListenerId, MountPoint, SurfaceNode};
use super::input::PointerEvent;
use super::resize::ResizePolicy;
use super::viewport::Viewport;
use crate::camera::PerspectiveCamera;
use crate::config::ViewerConfig;
use crate::frame::FrameInfo;
use crate::loaders::{AssetLoader, LoadProgress};
use crate::scene::{
    InteractiveObject, InteractiveObjectState, ModelSlot, Propagation, SceneAssembly, SceneGraph, SceneHandle,
};

/// Where the imported model is, as seen from outside the mount
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadStatus {
    NotRequested,
    Loading { progress: Option<LoadProgress> },
    Loaded,
    Failed,
}

/// Outcome of `unmount`; failures were logged and never abort the teardown
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeardownReport {
    pub failures: Vec<SceneError>,
    /// The mount had already been torn down, nothing was done
    pub already_unmounted: bool,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One mounted scene, driven by its host
#[derive(Debug)]
pub struct SceneMount {
    assembly: SceneAssembly,
    scene: Option<SceneHandle>,
    node: Option<SurfaceNode>,
    listener: Option<ListenerId>,
    animation: AnimationLoop,
    resize: ResizePolicy,
    reports: Vec<SceneError>,
    last_progress: Option<LoadProgress>,
    frames_rendered: u64,
    mounted: bool,
}

impl SceneMount {
    /// Build the configured scene inside `host`.
    ///
    /// Fails with `EmptyViewport` if the mount point has a zero dimension.
    /// Anything acquired before a failing step is released again.
    pub fn mount<H: Host + ?Sized>(
        host: &mut H,
        backend: &mut dyn RenderBackend,
        config: &ViewerConfig,
        loader: &dyn AssetLoader,
    ) -> Result<SceneMount> {
        let viewport = Viewport::try_from(host.client_size())?;
        let assembly = SceneAssembly::from(config.scene);
        let mut scene = assembly.build(viewport, config, backend, loader)?;

        let node = match host.append_surface(scene.surface) {
            Ok(node) => node,
            Err(e) => {
                for failure in release_scene(&mut scene, backend) {
                    warn!("Cleanup after failed mount: {}", failure);
                }
                return Err(e);
            }
        };
        let listener = host.add_resize_listener();
        let animation = AnimationLoop::start(host);

        info!(
            "Mounted {:?} scene at {}x{}",
            assembly, viewport.width, viewport.height
        );

        Ok(SceneMount {
            assembly,
            scene: Some(scene),
            node: Some(node),
            listener: Some(listener),
            animation,
            resize: ResizePolicy::new(viewport),
            reports: Vec::new(),
            last_progress: None,
            frames_rendered: 0,
            mounted: true,
        })
    }

    /// Run one frame delivered by the host scheduler.
    ///
    /// Returns `None` when the request is stale (after `unmount`, or not
    /// the one this mount is waiting for); nothing is touched then.
    pub fn tick<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        backend: &mut dyn RenderBackend,
        request: FrameRequest,
        delta: f32,
    ) -> Option<FrameInfo> {
        let info = self.animation.accept(request, delta)?;
        self.animation.rearm(host);

        let scene = self.scene.as_mut()?;
        poll_model(scene, backend, &mut self.reports, &mut self.last_progress);

        scene.advance_spin();
        if let Some(controls) = scene.controls.as_mut() {
            controls.update(&mut scene.camera);
        }

        let overlays = scene.overlays();
        let frame = RenderFrame {
            camera: &scene.camera,
            graph: &scene.graph,
            overlays: &overlays,
        };
        match backend.render(scene.surface, &frame) {
            Ok(()) => self.frames_rendered += 1,
            Err(e) => warn!("Frame {} not rendered: {}", info.number, e),
        }
        Some(info)
    }

    /// Re-read the mount point size after a resize notification
    pub fn on_resize<H: MountPoint + ?Sized>(&mut self, host: &H, backend: &mut dyn RenderBackend) -> Result<Viewport> {
        let scene = self
            .scene
            .as_mut()
            .ok_or_else(|| SceneError::Host("resize delivered to an unmounted scene".to_string()))?;
        self.resize
            .on_resize(host.client_size(), &mut scene.camera, backend, scene.surface)
    }

    /// Route pointer input to the interactive object, then to the orbit controls
    pub fn on_pointer(&mut self, event: PointerEvent, backend: &mut dyn RenderBackend) -> Propagation {
        let (Some(scene), Some(viewport)) = (self.scene.as_mut(), self.resize.current()) else {
            return Propagation::Continue;
        };

        match event {
            PointerEvent::Moved(position) => {
                let over = pointer_over_object(scene, viewport, position);
                if let Some(object) = scene.interactive.as_mut() {
                    let changed = if over { object.pointer_enter() } else { object.pointer_leave() };
                    if changed {
                        apply_hover_color(object, backend);
                    }
                }
                if let Some(controls) = scene.controls.as_mut() {
                    controls.pointer_move(position, viewport);
                }
                Propagation::Continue
            }
            PointerEvent::Pressed(position) => {
                if pointer_over_object(scene, viewport, position) {
                    if let Some(object) = scene.interactive.as_mut() {
                        object.pointer_down(position);
                    }
                }
                if let Some(controls) = scene.controls.as_mut() {
                    controls.pointer_down(position);
                }
                Propagation::Continue
            }
            PointerEvent::Released(position) => {
                let over = pointer_over_object(scene, viewport, position);
                let propagation = scene
                    .interactive
                    .as_mut()
                    .map_or(Propagation::Continue, |object| object.pointer_up(position, over));
                if let Some(controls) = scene.controls.as_mut() {
                    match propagation {
                        Propagation::Stop => controls.cancel_drag(),
                        Propagation::Continue => controls.pointer_up(),
                    }
                }
                propagation
            }
            PointerEvent::Wheel(delta) => {
                if let Some(controls) = scene.controls.as_mut() {
                    controls.wheel(delta);
                }
                Propagation::Continue
            }
            PointerEvent::Left => {
                if let Some(object) = scene.interactive.as_mut() {
                    if object.pointer_leave() {
                        apply_hover_color(object, backend);
                    }
                }
                if let Some(controls) = scene.controls.as_mut() {
                    controls.pointer_up();
                }
                Propagation::Continue
            }
        }
    }

    /// Tear the scene down. Safe to call more than once; later calls do nothing.
    pub fn unmount<H: Host + ?Sized>(&mut self, host: &mut H, backend: &mut dyn RenderBackend) -> TeardownReport {
        if !self.mounted {
            debug!("Unmount of an already unmounted scene ignored");
            return TeardownReport {
                failures: Vec::new(),
                already_unmounted: true,
            };
        }
        self.mounted = false;

        let mut failures = Vec::new();

        self.animation.stop(host);

        if let Some(listener) = self.listener.take() {
            if let Err(e) = host.remove_resize_listener(listener) {
                failures.push(e.into_disposal("resize listener"));
            }
        }

        if let Some(node) = self.node.take() {
            if let Err(e) = host.remove_surface(node) {
                failures.push(e.into_disposal("surface node"));
            }
        }

        if let Some(mut scene) = self.scene.take() {
            failures.extend(release_scene(&mut scene, backend));
        }

        for failure in &failures {
            warn!("Teardown step failed: {}", failure);
        }
        self.reports.extend(failures.iter().cloned());
        info!(
            "Unmounted {:?} scene after {} frames",
            self.assembly, self.frames_rendered
        );

        TeardownReport {
            failures,
            already_unmounted: false,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn assembly(&self) -> SceneAssembly {
        self.assembly
    }

    pub fn scene(&self) -> Option<&SceneHandle> {
        self.scene.as_ref()
    }

    pub fn graph(&self) -> Option<&SceneGraph> {
        self.scene.as_ref().map(|s| &s.graph)
    }

    pub fn camera(&self) -> Option<&PerspectiveCamera> {
        self.scene.as_ref().map(|s| &s.camera)
    }

    pub fn interactive(&self) -> Option<&InteractiveObject> {
        self.scene.as_ref().and_then(|s| s.interactive.as_ref())
    }

    pub fn interactive_state(&self) -> Option<InteractiveObjectState> {
        self.interactive().map(InteractiveObject::state)
    }

    /// Give the interactive object a way to change the pointer cursor
    pub fn set_cursor_hint(&mut self, cursor: impl FnMut(CursorHint) + 'static) {
        if let Some(object) = self.scene.as_mut().and_then(|s| s.interactive.as_mut()) {
            object.set_cursor_hint(cursor);
        }
    }

    /// Labels visible on the current state of the scene
    pub fn overlays(&self) -> Vec<Overlay> {
        self.scene.as_ref().map(SceneHandle::overlays).unwrap_or_default()
    }

    /// Non-fatal failures so far: asset loads and teardown steps
    pub fn reports(&self) -> &[SceneError] {
        &self.reports
    }

    pub fn load_status(&self) -> LoadStatus {
        match self.scene.as_ref().map(|s| &s.model) {
            None | Some(ModelSlot::NotRequested) => LoadStatus::NotRequested,
            Some(ModelSlot::Loading(_)) => LoadStatus::Loading {
                progress: self.last_progress,
            },
            Some(ModelSlot::Loaded(_)) => LoadStatus::Loaded,
            Some(ModelSlot::Failed) => LoadStatus::Failed,
        }
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.resize.current()
    }

    pub fn resize_listener(&self) -> Option<ListenerId> {
        self.listener
    }

    pub fn surface_node(&self) -> Option<SurfaceNode> {
        self.node
    }

    /// The frame this mount is waiting for
    pub fn pending_frame(&self) -> Option<FrameRequest> {
        self.animation.token().map(|t| t.request())
    }
}

impl Drop for SceneMount {
    fn drop(&mut self) {
        if self.mounted {
            warn!("SceneMount dropped while still mounted; host resources were not released");
        }
    }
}

/// Drain load progress and, once the load settles, attach or report it
fn poll_model(
    scene: &mut SceneHandle,
    backend: &mut dyn RenderBackend,
    reports: &mut Vec<SceneError>,
    last_progress: &mut Option<LoadProgress>,
) {
    let ModelSlot::Loading(pending) = &mut scene.model else {
        return;
    };

    for progress in pending.drain_progress() {
        if let Some(percent) = progress.percent() {
            info!("Model loading: {:.2}%", percent);
        }
        *last_progress = Some(progress);
    }

    let path = pending.path().to_path_buf();
    let Some(result) = pending.try_complete() else {
        return;
    };

    match result.and_then(|model| scene.attach_model(&model, backend)) {
        Ok(_) => info!("Model loaded from {:?}", path),
        Err(e) => {
            let e = match e {
                SceneError::AssetLoad { .. } => e,
                other => SceneError::AssetLoad {
                    path,
                    reason: other.to_string(),
                },
            };
            error!("Error loading model: {}", e);
            scene.model = ModelSlot::Failed;
            reports.push(e);
        }
    }
}

/// Dispose everything the handle owns: geometries, materials, textures, controls, surface
fn release_scene(scene: &mut SceneHandle, backend: &mut dyn RenderBackend) -> Vec<SceneError> {
    // An unfinished load is abandoned here; its result is never delivered
    scene.model = ModelSlot::NotRequested;

    let mut failures = scene.dispose_resources(backend);
    if let Some(controls) = scene.controls.as_mut() {
        if let Err(e) = controls.dispose() {
            failures.push(e);
        }
    }
    let surface = ResourceId::Surface(scene.surface);
    if let Err(e) = backend.dispose(surface) {
        failures.push(e.into_disposal(surface.label()));
    }
    failures
}

fn pointer_over_object(scene: &SceneHandle, viewport: Viewport, position: Vec2) -> bool {
    let Some(object) = scene.interactive.as_ref() else {
        return false;
    };
    let ray = scene.camera.ray_through(viewport.to_ndc(position.x, position.y));
    object.hit(&ray, scene.graph.world_matrix(object.node)).is_some()
}

fn apply_hover_color(object: &InteractiveObject, backend: &mut dyn RenderBackend) {
    if let Err(e) = backend.set_material_color(object.material, object.color()) {
        warn!("Failed to update hover colour: {}", e);
    }
}
