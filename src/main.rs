use std::cell::Cell;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::sync::Arc;

use clap::Parser;
use log::{debug, error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorIcon, Window, WindowId},
};

use scene_viewer::cli::Cli;
use scene_viewer::core::{
    CursorHint, FrameRequest, FrameScheduler, ListenerId, MountPoint, PointerAdapter, ResizeEvents, SceneError,
    SceneMount, SurfaceId, SurfaceNode,
};
use scene_viewer::frame::FrameClock;
use scene_viewer::gpu::WgpuBackend;
use scene_viewer::loaders::ThreadedLoader;
use scene_viewer::ViewerConfig;

// === Host ===

/// The viewer window seen as a mount point, frame scheduler and resize source
struct WinitHost {
    window: Arc<Window>,
    nodes: Vec<SurfaceNode>,
    pending: BTreeSet<FrameRequest>,
    listeners: Vec<ListenerId>,
    next_id: u64,
}

impl WinitHost {
    fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            nodes: Vec::new(),
            pending: BTreeSet::new(),
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Fire the oldest pending frame request, if any
    fn take_due_frame(&mut self) -> Option<FrameRequest> {
        self.pending.pop_first()
    }

    fn has_resize_listeners(&self) -> bool {
        !self.listeners.is_empty()
    }
}

impl MountPoint for WinitHost {
    fn client_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    fn append_surface(&mut self, surface: SurfaceId) -> scene_viewer::core::Result<SurfaceNode> {
        let node = SurfaceNode(self.next());
        debug!("Attached surface #{} as node {:?}", surface.0, node);
        self.nodes.push(node);
        Ok(node)
    }

    fn remove_surface(&mut self, node: SurfaceNode) -> scene_viewer::core::Result<()> {
        let before = self.nodes.len();
        self.nodes.retain(|n| *n != node);
        if self.nodes.len() == before {
            return Err(SceneError::Host(format!("{:?} is not attached", node)));
        }
        Ok(())
    }
}

impl FrameScheduler for WinitHost {
    fn request_frame(&mut self) -> FrameRequest {
        let request = FrameRequest(self.next());
        self.pending.insert(request);
        self.window.request_redraw();
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        self.pending.remove(&request);
    }
}

impl ResizeEvents for WinitHost {
    fn add_resize_listener(&mut self) -> ListenerId {
        let listener = ListenerId(self.next());
        self.listeners.push(listener);
        listener
    }

    fn remove_resize_listener(&mut self, listener: ListenerId) -> scene_viewer::core::Result<()> {
        let before = self.listeners.len();
        self.listeners.retain(|l| *l != listener);
        if self.listeners.len() == before {
            return Err(SceneError::Host(format!("{:?} is not registered", listener)));
        }
        Ok(())
    }
}

// === Application ===

struct App {
    config: ViewerConfig,
    initial_size: (u32, u32),
    show_ui: bool,
    loader: ThreadedLoader,
    host: Option<WinitHost>,
    backend: Option<WgpuBackend>,
    mount: Option<SceneMount>,
    pointer: PointerAdapter,
    clock: FrameClock,
    cursor: Rc<Cell<CursorHint>>,
}

impl App {
    fn new(config: ViewerConfig, cli: &Cli) -> Self {
        Self {
            config,
            initial_size: (cli.width, cli.height),
            show_ui: !cli.no_ui,
            loader: ThreadedLoader::default(),
            host: None,
            backend: None,
            mount: None,
            pointer: PointerAdapter::new(),
            clock: FrameClock::default(),
            cursor: Rc::new(Cell::new(CursorHint::Auto)),
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let (width, height) = self.initial_size;
        let window = Arc::new(
            event_loop.create_window(
                Window::default_attributes()
                    .with_title("Scene Viewer")
                    .with_inner_size(winit::dpi::LogicalSize::new(width, height)),
            )?,
        );

        let mut backend = pollster::block_on(WgpuBackend::new(window.clone(), self.show_ui))?;
        let mut host = WinitHost::new(window);

        let mut mount = SceneMount::mount(&mut host, &mut backend, &self.config, &self.loader)?;
        let cursor = self.cursor.clone();
        mount.set_cursor_hint(move |hint| cursor.set(hint));
        self.clock.reset();

        self.host = Some(host);
        self.backend = Some(backend);
        self.mount = Some(mount);
        Ok(())
    }

    fn shutdown(&mut self) {
        if let (Some(mount), Some(host), Some(backend)) = (self.mount.as_mut(), self.host.as_mut(), self.backend.as_mut())
        {
            let report = mount.unmount(host, backend);
            if report.is_clean() {
                info!("Scene torn down cleanly");
            } else {
                warn!("Scene torn down with {} failed steps", report.failures.len());
            }
            let live = backend.live_resources();
            if live > 0 {
                warn!("{} GPU resources still live after teardown", live);
            }
        }
        self.mount = None;
    }

    fn apply_cursor(&self) {
        let Some(host) = &self.host else {
            return;
        };
        let icon = match self.cursor.get() {
            CursorHint::Pointer => CursorIcon::Pointer,
            CursorHint::Auto => CursorIcon::Default,
        };
        host.window.set_cursor(icon);
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.host.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            error!("Failed to start viewer: {:#}", e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        // Let egui see the event first
        let consumed = self
            .backend
            .as_mut()
            .is_some_and(|backend| backend.handle_window_event(&event));

        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => {
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(_) => {
                if let (Some(mount), Some(host), Some(backend)) =
                    (self.mount.as_mut(), self.host.as_ref(), self.backend.as_mut())
                {
                    if host.has_resize_listeners() {
                        if let Err(e) = mount.on_resize(host, backend) {
                            debug!("Resize ignored: {}", e);
                        }
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                let delta = self.clock.tick();
                if let (Some(mount), Some(host), Some(backend)) =
                    (self.mount.as_mut(), self.host.as_mut(), self.backend.as_mut())
                {
                    if let Some(request) = host.take_due_frame() {
                        mount.tick(host, backend, request, delta);
                    }
                }
            }
            ref input if !consumed => {
                let Some(pointer_event) = self.pointer.translate(input) else {
                    return;
                };
                if let (Some(mount), Some(backend)) = (self.mount.as_mut(), self.backend.as_mut()) {
                    mount.on_pointer(pointer_event, backend);
                }
                self.apply_cursor();
            }
            _ => {}
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = ViewerConfig::from_cli(&cli)?;

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, &cli);

    info!("Scene Viewer - drag to orbit, wheel to zoom, Escape to quit");
    event_loop.run_app(&mut app)?;

    Ok(())
}
