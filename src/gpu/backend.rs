use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result as AnyResult;
use log::{debug, info};
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::context::GpuContext;
use super::ui::{ScreenLabel, UiLayer};
use crate::core::{
    GeometryId, MaterialDesc, MaterialId, RenderBackend, RenderFrame, ResourceId, Result, SceneError, SurfaceId,
    SurfaceOptions, TextureData, TextureId, Viewport,
};
use crate::math::srgb_to_linear;
use crate::scene::{GeometryData, MeshNode};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const MSAA_SAMPLES: u32 = 4;
const MODEL_ENTRY_SIZE: u64 = std::mem::size_of::<ModelEntry>() as u64;
/// Shadow-map depth offset against acne, in 0..1 depth units
const SHADOW_BIAS: f32 = 0.002;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
    uv: [f32; 2],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Per-frame camera and light data for GPU
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct FrameUniform {
    view_proj: [[f32; 4]; 4],
    camera_position: [f32; 4],
    light_direction: [f32; 4],
    light_color: [f32; 4],
    ambient_color: [f32; 4],
    light_view_proj: [[f32; 4]; 4],
    /// x: shadows on, y: depth bias, z: one shadow-map texel in uv
    shadow_params: [f32; 4],
}

impl FrameUniform {
    /// `shadows` is whether the target surface renders shadows at all
    fn from_frame(frame: &RenderFrame<'_>, shadows: bool) -> Self {
        let camera = frame.camera.to_uniform();
        let scaled = |rgb: [f32; 3], intensity: f32| {
            let [r, g, b] = srgb_to_linear(rgb);
            [r * intensity, g * intensity, b * intensity, 1.0]
        };

        let (light_direction, light_color) = match frame.graph.directional_light() {
            Some((light, direction)) => (direction.extend(0.0).to_array(), scaled(light.color, light.intensity)),
            None => ([0.0, -1.0, 0.0, 0.0], [0.0; 4]),
        };
        let ambient_color = frame
            .graph
            .ambient_light()
            .map(|light| scaled(light.color, light.intensity))
            .unwrap_or([0.0; 4]);

        let (light_view_proj, shadow_params) = match frame.graph.shadow_caster().filter(|_| shadows) {
            Some((light, light_space)) => (
                light_space.to_cols_array_2d(),
                [1.0, SHADOW_BIAS, 1.0 / light.shadow.map_size as f32, 0.0],
            ),
            None => (glam::Mat4::IDENTITY.to_cols_array_2d(), [0.0; 4]),
        };

        Self {
            view_proj: camera.view_proj,
            camera_position: [camera.position[0], camera.position[1], camera.position[2], 1.0],
            light_direction,
            light_color,
            ambient_color,
            light_view_proj,
            shadow_params,
        }
    }
}

/// Per-instance model matrix and shadow flags
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ModelEntry {
    model: [[f32; 4]; 4],
    /// x: receives shadows
    flags: [f32; 4],
}

impl ModelEntry {
    fn new(mesh: &MeshNode, world: &glam::Mat4) -> Self {
        Self {
            model: world.to_cols_array_2d(),
            flags: [if mesh.receive_shadow { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct MaterialUniform {
    base_color: [f32; 4],
}

impl MaterialUniform {
    fn new(color: [f32; 4]) -> Self {
        let [r, g, b] = srgb_to_linear([color[0], color[1], color[2]]);
        Self {
            base_color: [r, g, b, color[3]],
        }
    }
}

struct GpuGeometry {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

struct GpuMaterial {
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct GpuTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// Depth rendered from the directional light, bound as group 2
struct ShadowMap {
    size: u32,
    view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
}

/// A configured window surface with its depth/MSAA targets and pipeline
struct SurfaceTarget {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    sample_count: u32,
    clear_color: wgpu::Color,
    depth: wgpu::TextureView,
    msaa: Option<wgpu::TextureView>,
    pipeline: wgpu::RenderPipeline,
    shadows: bool,
    ui: Option<UiLayer>,
}

/// wgpu renderer behind the scene core's backend seam
pub struct WgpuBackend {
    window: Arc<Window>,
    gpu: GpuContext,
    /// Surface created to pick a compatible adapter, handed out first
    spare_surface: Option<wgpu::Surface<'static>>,
    shader: wgpu::ShaderModule,
    frame_layout: wgpu::BindGroupLayout,
    material_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    shadow_layout: wgpu::BindGroupLayout,
    shadow_sampler: wgpu::Sampler,
    shadow_pipeline: wgpu::RenderPipeline,
    shadow_map: ShadowMap,
    sampler: wgpu::Sampler,
    white: GpuTexture,
    frame_uniform: wgpu::Buffer,
    models: wgpu::Buffer,
    model_capacity: u64,
    frame_bind_group: wgpu::BindGroup,
    surfaces: HashMap<SurfaceId, SurfaceTarget>,
    geometries: HashMap<GeometryId, GpuGeometry>,
    materials: HashMap<MaterialId, GpuMaterial>,
    textures: HashMap<TextureId, GpuTexture>,
    next_id: u64,
    show_ui: bool,
}

impl WgpuBackend {
    pub async fn new(window: Arc<Window>, show_ui: bool) -> AnyResult<Self> {
        let instance = GpuContext::instance();
        let surface = instance.create_surface(window.clone())?;
        let gpu = GpuContext::new_with_surface(instance, &surface).await?;
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("mesh.wgsl").into()),
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                // Binding 0: Camera and lights
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Binding 1: Model matrices, indexed by instance
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
            label: Some("frame_bind_group_layout"),
        });

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
            label: Some("material_bind_group_layout"),
        });

        let shadow_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
            label: Some("shadow_bind_group_layout"),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &material_layout, &shadow_layout],
            push_constant_ranges: &[],
        });

        let shadow_pipeline = create_shadow_pipeline(device, &shader, &frame_layout);
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        // Placeholder until a shadow-casting light is rendered
        let shadow_map = create_shadow_map(device, &shadow_layout, &shadow_sampler, 1);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let white = upload_texture(
            &gpu,
            &TextureData {
                width: 1,
                height: 1,
                rgba: vec![255; 4],
            },
        );

        let frame_uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform"),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let model_capacity = 64 * MODEL_ENTRY_SIZE;
        let models = create_model_buffer(device, model_capacity);
        let frame_bind_group = create_frame_bind_group(device, &frame_layout, &frame_uniform, &models);

        Ok(Self {
            window,
            spare_surface: Some(surface),
            shader,
            frame_layout,
            material_layout,
            pipeline_layout,
            shadow_layout,
            shadow_sampler,
            shadow_pipeline,
            shadow_map,
            sampler,
            white,
            frame_uniform,
            models,
            model_capacity,
            frame_bind_group,
            surfaces: HashMap::new(),
            geometries: HashMap::new(),
            materials: HashMap::new(),
            textures: HashMap::new(),
            next_id: 0,
            show_ui,
            gpu,
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// Offer a window event to the UI; true if it was consumed there
    pub fn handle_window_event(&mut self, event: &winit::event::WindowEvent) -> bool {
        let window = &self.window;
        self.surfaces
            .values_mut()
            .filter_map(|target| target.ui.as_mut())
            .any(|ui| ui.on_window_event(window, event))
    }

    /// Resources created through `RenderBackend` and not yet disposed
    pub fn live_resources(&self) -> usize {
        self.geometries.len() + self.materials.len() + self.textures.len() + self.surfaces.len()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn create_pipeline(&self, format: wgpu::TextureFormat, sample_count: u32) -> wgpu::RenderPipeline {
        self.gpu
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Mesh Pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &self.shader,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &self.shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: sample_count,
                    ..Default::default()
                },
                multiview: None,
                cache: None,
            })
    }

    fn ensure_shadow_map(&mut self, size: u32) {
        if self.shadow_map.size == size {
            return;
        }
        debug!("Creating {}x{} shadow map", size, size);
        self.shadow_map = create_shadow_map(&self.gpu.device, &self.shadow_layout, &self.shadow_sampler, size);
    }

    fn ensure_model_capacity(&mut self, count: usize) {
        let needed = count.max(1) as u64 * MODEL_ENTRY_SIZE;
        if needed <= self.model_capacity {
            return;
        }
        self.model_capacity = needed.next_power_of_two();
        debug!("Growing model buffer to {} bytes", self.model_capacity);
        self.models = create_model_buffer(&self.gpu.device, self.model_capacity);
        self.frame_bind_group =
            create_frame_bind_group(&self.gpu.device, &self.frame_layout, &self.frame_uniform, &self.models);
    }
}

impl RenderBackend for WgpuBackend {
    fn create_surface(&mut self, viewport: Viewport, options: &SurfaceOptions) -> Result<SurfaceId> {
        let surface = match self.spare_surface.take() {
            Some(surface) => surface,
            None => self
                .gpu
                .instance
                .create_surface(self.window.clone())
                .map_err(|e| SceneError::Surface(e.to_string()))?,
        };

        let config = self.gpu.surface_config(&surface, viewport.width, viewport.height);
        surface.configure(&self.gpu.device, &config);

        let sample_count = if options.antialias { MSAA_SAMPLES } else { 1 };

        let (depth, msaa) = create_attachments(&self.gpu.device, &config, sample_count);
        let pipeline = self.create_pipeline(config.format, sample_count);
        let ui = self
            .show_ui
            .then(|| UiLayer::new(&self.window, &self.gpu.device, config.format));

        let [r, g, b] = srgb_to_linear(options.clear_color);
        let id = SurfaceId(self.next_id());
        info!(
            "Surface {} configured: {}x{} {:?}, {}x MSAA, shadows {}",
            id.0,
            config.width,
            config.height,
            config.format,
            sample_count,
            if options.shadows { "on" } else { "off" }
        );
        self.surfaces.insert(
            id,
            SurfaceTarget {
                surface,
                config,
                sample_count,
                clear_color: wgpu::Color {
                    r: r as f64,
                    g: g as f64,
                    b: b as f64,
                    a: 1.0,
                },
                depth,
                msaa,
                pipeline,
                shadows: options.shadows,
                ui,
            },
        );
        Ok(id)
    }

    fn resize_surface(&mut self, surface: SurfaceId, viewport: Viewport) -> Result<()> {
        let device = &self.gpu.device;
        let target = self
            .surfaces
            .get_mut(&surface)
            .ok_or(SceneError::UnknownResource(ResourceId::Surface(surface)))?;

        target.config.width = viewport.width;
        target.config.height = viewport.height;
        target.surface.configure(device, &target.config);
        let (depth, msaa) = create_attachments(device, &target.config, target.sample_count);
        target.depth = depth;
        target.msaa = msaa;
        Ok(())
    }

    fn create_geometry(&mut self, data: &GeometryData) -> Result<GeometryId> {
        let vertices: Vec<Vertex> = data
            .positions
            .iter()
            .enumerate()
            .map(|(i, &position)| Vertex {
                position,
                normal: data.normals.get(i).copied().unwrap_or([0.0, 0.0, 1.0]),
                uv: data.uvs.get(i).copied().unwrap_or([0.0, 0.0]),
            })
            .collect();

        let device = &self.gpu.device;
        let geometry = GpuGeometry {
            vertices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Vertex Buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            indices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Index Buffer"),
                contents: bytemuck::cast_slice(&data.indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            index_count: data.indices.len() as u32,
        };

        let id = GeometryId(self.next_id());
        self.geometries.insert(id, geometry);
        Ok(id)
    }

    fn create_material(&mut self, desc: &MaterialDesc) -> Result<MaterialId> {
        let view = match desc.texture {
            Some(texture) => {
                &self
                    .textures
                    .get(&texture)
                    .ok_or(SceneError::UnknownResource(ResourceId::Texture(texture)))?
                    .view
            }
            None => &self.white.view,
        };

        let device = &self.gpu.device;
        let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Material Uniform"),
            contents: bytemuck::cast_slice(&[MaterialUniform::new(desc.base_color)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
            label: Some("material_bind_group"),
        });

        let id = MaterialId(self.next_id());
        self.materials.insert(id, GpuMaterial { uniform, bind_group });
        Ok(id)
    }

    fn create_texture(&mut self, data: &TextureData) -> Result<TextureId> {
        let expected = data.width as usize * data.height as usize * 4;
        if data.width == 0 || data.height == 0 || data.rgba.len() != expected {
            return Err(SceneError::Host(format!(
                "invalid texture: {}x{} with {} bytes",
                data.width,
                data.height,
                data.rgba.len()
            )));
        }

        let texture = upload_texture(&self.gpu, data);
        let id = TextureId(self.next_id());
        self.textures.insert(id, texture);
        Ok(id)
    }

    fn set_material_color(&mut self, material: MaterialId, color: [f32; 4]) -> Result<()> {
        let gpu_material = self
            .materials
            .get(&material)
            .ok_or(SceneError::UnknownResource(ResourceId::Material(material)))?;
        self.gpu.queue.write_buffer(
            &gpu_material.uniform,
            0,
            bytemuck::cast_slice(&[MaterialUniform::new(color)]),
        );
        Ok(())
    }

    fn render(&mut self, surface: SurfaceId, frame: &RenderFrame<'_>) -> Result<()> {
        let shadows = self
            .surfaces
            .get(&surface)
            .ok_or(SceneError::UnknownResource(ResourceId::Surface(surface)))?
            .shadows;
        let caster = frame.graph.shadow_caster().filter(|_| shadows);
        if let Some((light, _)) = caster {
            self.ensure_shadow_map(light.shadow.map_size);
        }

        let meshes = frame.graph.meshes();
        self.ensure_model_capacity(meshes.len());

        let entries: Vec<ModelEntry> = meshes
            .iter()
            .map(|(_, mesh, world)| ModelEntry::new(mesh, world))
            .collect();
        let queue = &self.gpu.queue;
        if !entries.is_empty() {
            queue.write_buffer(&self.models, 0, bytemuck::cast_slice(&entries));
        }
        queue.write_buffer(
            &self.frame_uniform,
            0,
            bytemuck::cast_slice(&[FrameUniform::from_frame(frame, shadows)]),
        );

        let device = &self.gpu.device;
        let target = self
            .surfaces
            .get_mut(&surface)
            .ok_or(SceneError::UnknownResource(ResourceId::Surface(surface)))?;

        let output = match target.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                target.surface.configure(device, &target.config);
                return Err(SceneError::Surface("surface outdated, reconfigured".to_string()));
            }
            Err(e) => return Err(SceneError::Surface(e.to_string())),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Scene Encoder"),
        });

        if caster.is_some() {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_map.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            shadow_pass.set_pipeline(&self.shadow_pipeline);
            shadow_pass.set_bind_group(0, &self.frame_bind_group, &[]);

            for (instance, (_, mesh, _)) in meshes.iter().enumerate() {
                if !mesh.cast_shadow {
                    continue;
                }
                if let Some(geometry) = self.geometries.get(&mesh.geometry) {
                    draw_geometry(&mut shadow_pass, geometry, instance as u32);
                }
            }
        }

        {
            let (color_view, resolve_target) = match &target.msaa {
                Some(msaa) => (msaa, Some(&view)),
                None => (&view, None),
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(target.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &target.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&target.pipeline);
            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
            render_pass.set_bind_group(2, &self.shadow_map.bind_group, &[]);

            for (instance, (node, mesh, _)) in meshes.iter().enumerate() {
                let (Some(geometry), Some(material)) =
                    (self.geometries.get(&mesh.geometry), self.materials.get(&mesh.material))
                else {
                    debug!("Skipping node {:?} with released resources", node);
                    continue;
                };
                render_pass.set_bind_group(1, &material.bind_group, &[]);
                draw_geometry(&mut render_pass, geometry, instance as u32);
            }
        }

        if let Some(ui) = target.ui.as_mut() {
            let labels = screen_labels(frame, target.config.width, target.config.height);
            ui.draw(
                &self.window,
                device,
                queue,
                &mut encoder,
                &view,
                [target.config.width, target.config.height],
                &labels,
            );
        }

        queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn dispose(&mut self, resource: ResourceId) -> Result<()> {
        let released = match resource {
            ResourceId::Geometry(id) => self.geometries.remove(&id).is_some(),
            ResourceId::Material(id) => self.materials.remove(&id).is_some(),
            ResourceId::Texture(id) => self.textures.remove(&id).is_some(),
            ResourceId::Surface(id) => self.surfaces.remove(&id).is_some(),
        };
        if released {
            Ok(())
        } else {
            Err(SceneError::UnknownResource(resource))
        }
    }
}

fn draw_geometry(pass: &mut wgpu::RenderPass<'_>, geometry: &GpuGeometry, instance: u32) {
    if geometry.index_count == 0 {
        return;
    }
    pass.set_vertex_buffer(0, geometry.vertices.slice(..));
    pass.set_index_buffer(geometry.indices.slice(..), wgpu::IndexFormat::Uint32);
    pass.draw_indexed(0..geometry.index_count, 0, instance..instance + 1);
}

fn screen_labels(frame: &RenderFrame<'_>, width: u32, height: u32) -> Vec<ScreenLabel> {
    let Ok(viewport) = Viewport::new(width, height) else {
        return Vec::new();
    };
    frame
        .overlays
        .iter()
        .filter_map(|overlay| {
            frame
                .camera
                .project(overlay.world_position, viewport)
                .map(|position| ScreenLabel {
                    text: overlay.text.clone(),
                    position,
                })
        })
        .collect()
}

fn upload_texture(gpu: &GpuContext, data: &TextureData) -> GpuTexture {
    let size = wgpu::Extent3d {
        width: data.width,
        height: data.height,
        depth_or_array_layers: 1,
    };
    let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Base Colour Texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    gpu.queue.write_texture(
        texture.as_image_copy(),
        &data.rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * data.width),
            rows_per_image: Some(data.height),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture {
        _texture: texture,
        view,
    }
}

fn create_attachments(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    sample_count: u32,
) -> (wgpu::TextureView, Option<wgpu::TextureView>) {
    let size = wgpu::Extent3d {
        width: config.width,
        height: config.height,
        depth_or_array_layers: 1,
    };
    let target = |label, format| {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size,
                mip_level_count: 1,
                sample_count,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    };

    let depth = target("Depth Texture", DEPTH_FORMAT);
    let msaa = (sample_count > 1).then(|| target("MSAA Colour Texture", config.format));
    (depth, msaa)
}

fn create_shadow_map(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    size: u32,
) -> ShadowMap {
    let view = device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("Shadow Map"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default());

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some("shadow_bind_group"),
    });

    ShadowMap { size, view, bind_group }
}

/// Depth-only pipeline drawing casters from the light's point of view
fn create_shadow_pipeline(
    device: &wgpu::Device,
    shader: &wgpu::ShaderModule,
    frame_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Shadow Pipeline Layout"),
        bind_group_layouts: &[frame_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Shadow Pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_shadow"),
            buffers: &[Vertex::layout()],
            compilation_options: Default::default(),
        },
        fragment: None,
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState {
                constant: 2,
                slope_scale: 2.0,
                clamp: 0.0,
            },
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn create_model_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Model Entries"),
        size,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_frame_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    frame_uniform: &wgpu::Buffer,
    models: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_uniform.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: models.as_entire_binding(),
            },
        ],
        label: Some("frame_bind_group"),
    })
}
