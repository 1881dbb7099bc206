use glam::Vec2;
use log::info;
use winit::window::Window;

/// Placeholder sidebar buttons; none of them is wired to the scene yet
pub const SIDEBAR_BUTTONS: [&str; 4] = ["Action 1", "Action 2", "Toggle Something", "Reset View"];

/// Label to draw at a pixel position this frame
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenLabel {
    pub text: String,
    pub position: Vec2,
}

/// egui state, input routing and renderer for one surface
pub struct UiLayer {
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

impl UiLayer {
    pub fn new(window: &Window, device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let renderer = egui_wgpu::Renderer::new(device, format, egui_wgpu::RendererOptions::default());

        Self { ctx, state, renderer }
    }

    /// Returns true if egui consumed the event
    pub fn on_window_event(&mut self, window: &Window, event: &winit::event::WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Lay out the sidebar and labels and record them into `encoder` on top of `view`
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &mut self,
        window: &Window,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        size_in_pixels: [u32; 2],
        labels: &[ScreenLabel],
    ) {
        let raw_input = self.state.take_egui_input(window);
        let full_output = self.ctx.run(raw_input, |ctx| {
            sidebar(ctx);
            overlay_labels(ctx, labels);
        });

        self.state
            .handle_platform_output(window, full_output.platform_output);

        let pixels_per_point = self.ctx.pixels_per_point();
        let tris = self.ctx.tessellate(full_output.shapes, pixels_per_point);
        for (id, image_delta) in &full_output.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels,
            pixels_per_point,
        };
        self.renderer
            .update_buffers(device, queue, encoder, &tris, &screen_descriptor);

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            // SAFETY: egui-wgpu wants a 'static pass; this one is dropped
            // at the end of the block, before the encoder is used again.
            let render_pass_static = unsafe {
                std::mem::transmute::<&mut wgpu::RenderPass<'_>, &mut wgpu::RenderPass<'static>>(&mut render_pass)
            };
            self.renderer
                .render(render_pass_static, &tris, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }
}

fn sidebar(ctx: &egui::Context) {
    egui::SidePanel::left("sidebar")
        .resizable(false)
        .default_width(180.0)
        .show(ctx, |ui| {
            ui.heading("Controls");
            ui.separator();
            for label in SIDEBAR_BUTTONS {
                if ui.button(label).clicked() {
                    info!("Sidebar button pressed: {}", label);
                }
            }
        });
}

fn overlay_labels(ctx: &egui::Context, labels: &[ScreenLabel]) {
    let pixels_per_point = ctx.pixels_per_point();
    for (i, label) in labels.iter().enumerate() {
        let position = label.position / pixels_per_point;
        egui::Area::new(egui::Id::new(("overlay label", i)))
            .fixed_pos(egui::pos2(position.x, position.y))
            .pivot(egui::Align2::CENTER_CENTER)
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.label(label.text.as_str());
                });
            });
    }
}
