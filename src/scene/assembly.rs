use glam::Vec3;
use log::{debug, info, warn};

use crate::camera::PerspectiveCamera;
use crate::config::{SceneKind, ViewerConfig};
use crate::controls::OrbitControls;
use crate::core::{
    GeometryId, MaterialDesc, MaterialId, Overlay, RenderBackend, ResourceId, Result, SceneError,
    SurfaceId, TextureId, Viewport,
};
use crate::loaders::{AssetLoader, ModelData, PendingModel};

use super::geometry::GeometryData;
use super::graph::{AmbientLight, DirectionalLight, MeshNode, NodeId, NodeKind, SceneGraph, Transform};
use super::interactive::InteractiveObject;

const DEFAULT_MODEL_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// How the initial graph is populated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneAssembly {
    /// One lit cube, spun every frame
    Procedural,
    /// External model loaded in the background, with orbit navigation
    ImportedModel,
}

impl From<SceneKind> for SceneAssembly {
    fn from(kind: SceneKind) -> Self {
        match kind {
            SceneKind::Cube => SceneAssembly::Procedural,
            SceneKind::City => SceneAssembly::ImportedModel,
        }
    }
}

/// Where the imported model is in its lifetime
#[derive(Debug)]
pub enum ModelSlot {
    /// Procedural scenes never load anything
    NotRequested,
    Loading(PendingModel),
    Loaded(NodeId),
    Failed,
}

impl ModelSlot {
    pub fn is_loading(&self) -> bool {
        matches!(self, ModelSlot::Loading(_))
    }
}

/// Per-frame rotation applied to one node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spin {
    pub node: NodeId,
    pub step: f32,
}

/// Everything one mounted scene owns
#[derive(Debug)]
pub struct SceneHandle {
    pub graph: SceneGraph,
    pub camera: PerspectiveCamera,
    pub surface: SurfaceId,
    pub lights: Vec<NodeId>,
    pub model: ModelSlot,
    pub controls: Option<OrbitControls>,
    pub spin: Option<Spin>,
    pub interactive: Option<InteractiveObject>,
    /// Geometries, materials and textures in creation order
    owned: Vec<ResourceId>,
}

impl SceneAssembly {
    /// Create the surface and the pre-animation graph.
    ///
    /// On failure every allocation made so far is released again.
    pub fn build(
        self,
        viewport: Viewport,
        config: &ViewerConfig,
        backend: &mut dyn RenderBackend,
        loader: &dyn AssetLoader,
    ) -> Result<SceneHandle> {
        let surface = backend.create_surface(viewport, &config.surface_options())?;

        let mut owned = Vec::new();
        match self.populate(viewport, config, backend, loader, surface, &mut owned) {
            Ok(mut handle) => {
                handle.owned = owned;
                info!(
                    "Assembled {:?} scene: {} nodes, {} resources",
                    self,
                    handle.graph.len(),
                    handle.owned.len()
                );
                Ok(handle)
            }
            Err(e) => {
                for failure in release(backend, &owned) {
                    warn!("Cleanup after failed assembly: {}", failure);
                }
                if let Err(failure) = backend.dispose(ResourceId::Surface(surface)) {
                    warn!("Cleanup after failed assembly: {}", failure);
                }
                Err(e)
            }
        }
    }

    fn populate(
        self,
        viewport: Viewport,
        config: &ViewerConfig,
        backend: &mut dyn RenderBackend,
        loader: &dyn AssetLoader,
        surface: SurfaceId,
        owned: &mut Vec<ResourceId>,
    ) -> Result<SceneHandle> {
        let mut graph = SceneGraph::new(config.background);
        let root = graph.root();

        let mut camera = PerspectiveCamera::new(
            config.camera.fov,
            viewport.aspect(),
            config.camera.near,
            config.camera.far,
        )
        .with_position(Vec3::from_array(config.camera.position));
        camera.look_at(Vec3::from_array(config.camera.target));

        let ambient = graph.add(
            root,
            "ambient light",
            Transform::IDENTITY,
            NodeKind::AmbientLight(AmbientLight {
                color: config.ambient.color,
                intensity: config.ambient.intensity,
            }),
        );
        let directional = graph.add(
            root,
            "directional light",
            Transform::from_translation(Vec3::from_array(config.directional.position)),
            NodeKind::DirectionalLight(DirectionalLight {
                color: config.directional.color,
                intensity: config.directional.intensity,
                cast_shadow: config.directional.cast_shadow,
                shadow: config.directional.shadow.clone(),
            }),
        );

        let mut handle = SceneHandle {
            graph,
            camera,
            surface,
            lights: vec![ambient, directional],
            model: ModelSlot::NotRequested,
            controls: None,
            spin: None,
            interactive: None,
            owned: Vec::new(),
        };

        match self {
            SceneAssembly::Procedural => {
                let geometry = GeometryData::cuboid(Vec3::splat(config.cube.size));
                let node = add_mesh(
                    &mut handle.graph,
                    root,
                    "cube",
                    Transform::IDENTITY,
                    &geometry,
                    &MaterialDesc::color(config.cube.color),
                    backend,
                    owned,
                )?;
                handle.spin = Some(Spin {
                    node,
                    step: config.cube.spin_per_frame,
                });
            }
            SceneAssembly::ImportedModel => {
                let path = config.resolved_model_path();
                info!("Loading model from {:?}", path);
                handle.model = ModelSlot::Loading(loader.load(&path));
            }
        }

        if config.controls.enabled {
            let mut controls = OrbitControls::new(&config.controls);
            controls.target = handle.camera.target;
            handle.controls = Some(controls);
        }

        if let Some(interactive) = &config.interactive {
            let geometry = GeometryData::cuboid(Vec3::from_array(interactive.size));
            let desc = MaterialDesc::color(interactive.idle_color);
            let node = add_mesh(
                &mut handle.graph,
                root,
                "interactive box",
                Transform::from_translation(Vec3::from_array(interactive.position)),
                &geometry,
                &desc,
                backend,
                owned,
            )?;
            let material = handle
                .graph
                .node(node)
                .and_then(|n| n.as_mesh())
                .map(|mesh| mesh.material)
                .ok_or_else(|| SceneError::Host("interactive box lost its mesh".to_string()))?;
            handle.interactive = Some(InteractiveObject::new(node, material, interactive));
        }

        Ok(handle)
    }
}

#[allow(clippy::too_many_arguments)]
fn add_mesh(
    graph: &mut SceneGraph,
    parent: NodeId,
    name: &str,
    transform: Transform,
    geometry: &GeometryData,
    material: &MaterialDesc,
    backend: &mut dyn RenderBackend,
    owned: &mut Vec<ResourceId>,
) -> Result<NodeId> {
    let geometry_id = backend.create_geometry(geometry)?;
    owned.push(ResourceId::Geometry(geometry_id));
    let material_id = backend.create_material(material)?;
    owned.push(ResourceId::Material(material_id));

    Ok(graph.add(
        parent,
        name,
        transform,
        NodeKind::Mesh(MeshNode {
            geometry: geometry_id,
            material: material_id,
            cast_shadow: false,
            receive_shadow: false,
        }),
    ))
}

/// Dispose geometries, then materials, then textures; failures are collected
fn release(backend: &mut dyn RenderBackend, owned: &[ResourceId]) -> Vec<SceneError> {
    let rank = |r: &ResourceId| match r {
        ResourceId::Geometry(_) => 0,
        ResourceId::Material(_) => 1,
        ResourceId::Texture(_) => 2,
        ResourceId::Surface(_) => 3,
    };
    let mut ordered = owned.to_vec();
    ordered.sort_by_key(rank);

    ordered
        .into_iter()
        .filter_map(|resource| {
            backend
                .dispose(resource)
                .err()
                .map(|e| e.into_disposal(resource.label()))
        })
        .collect()
}

impl SceneHandle {
    /// Resources still owned, not counting the surface
    pub fn owned_resources(&self) -> &[ResourceId] {
        &self.owned
    }

    /// Apply the per-frame rotation, if any
    pub fn advance_spin(&mut self) {
        let Some(spin) = self.spin else {
            return;
        };
        if let Some(node) = self.graph.node_mut(spin.node) {
            node.transform.rotation.x += spin.step;
            node.transform.rotation.y += spin.step;
        }
    }

    /// Labels to draw this frame, positioned from current world transforms
    pub fn overlays(&self) -> Vec<Overlay> {
        self.interactive
            .iter()
            .filter_map(|object| {
                let world = self.graph.world_matrix(object.node);
                object.overlay_anchor(world).map(|world_position| Overlay {
                    text: object.label().to_string(),
                    world_position,
                })
            })
            .collect()
    }

    /// Upload an imported model and hang it under the root.
    ///
    /// Nothing is added to the graph unless every upload succeeds.
    pub fn attach_model(&mut self, model: &ModelData, backend: &mut dyn RenderBackend) -> Result<NodeId> {
        let mut created = Vec::new();
        match upload_model(model, backend, &mut created) {
            Ok(uploaded) => {
                self.owned.extend(created);
                let group = self.build_model_nodes(model, &uploaded);
                self.graph.traverse_mut(group, |node| {
                    if let NodeKind::Mesh(mesh) = &mut node.kind {
                        mesh.cast_shadow = true;
                        mesh.receive_shadow = true;
                    }
                });
                self.model = ModelSlot::Loaded(group);
                Ok(group)
            }
            Err(e) => {
                for failure in release(backend, &created) {
                    warn!("Cleanup after failed model upload: {}", failure);
                }
                Err(e)
            }
        }
    }

    fn build_model_nodes(&mut self, model: &ModelData, uploaded: &UploadedModel) -> NodeId {
        let root = self.graph.root();
        let group = self.graph.add(root, "model", Transform::IDENTITY, NodeKind::Group);

        let mut visited = vec![false; model.nodes.len()];
        let mut stack: Vec<(NodeId, usize)> = model.roots.iter().rev().map(|&i| (group, i)).collect();

        while let Some((parent, index)) = stack.pop() {
            let Some(source) = model.nodes.get(index) else {
                warn!("Model references missing node {}", index);
                continue;
            };
            if std::mem::replace(&mut visited[index], true) {
                warn!("Model node {} is referenced twice, skipping", index);
                continue;
            }

            let id = self.graph.add(parent, source.name.clone(), source.transform, NodeKind::Group);

            if let Some(primitives) = source.mesh.and_then(|m| uploaded.meshes.get(m)) {
                for (i, primitive) in primitives.iter().enumerate() {
                    self.graph.add(
                        id,
                        format!("{} #{}", source.name, i),
                        Transform::IDENTITY,
                        NodeKind::Mesh(primitive.clone()),
                    );
                }
            }

            for &child in source.children.iter().rev() {
                stack.push((id, child));
            }
        }

        debug!("Model attached with {} graph nodes", self.graph.len());
        group
    }

    /// Release geometries, materials and textures; returns every failure
    pub fn dispose_resources(&mut self, backend: &mut dyn RenderBackend) -> Vec<SceneError> {
        let owned = std::mem::take(&mut self.owned);
        release(backend, &owned)
    }
}

struct UploadedModel {
    /// Mesh nodes per model mesh, one per primitive
    meshes: Vec<Vec<MeshNode>>,
}

fn upload_model(
    model: &ModelData,
    backend: &mut dyn RenderBackend,
    created: &mut Vec<ResourceId>,
) -> Result<UploadedModel> {
    let mut textures: Vec<TextureId> = Vec::with_capacity(model.textures.len());
    for texture in &model.textures {
        let id = backend.create_texture(texture)?;
        created.push(ResourceId::Texture(id));
        textures.push(id);
    }

    let mut materials: Vec<MaterialId> = Vec::with_capacity(model.materials.len());
    for material in &model.materials {
        let desc = MaterialDesc {
            base_color: material.base_color,
            texture: material.texture.and_then(|i| textures.get(i).copied()),
        };
        let id = backend.create_material(&desc)?;
        created.push(ResourceId::Material(id));
        materials.push(id);
    }

    let mut fallback: Option<MaterialId> = None;
    let mut meshes = Vec::with_capacity(model.meshes.len());
    for primitives in &model.meshes {
        let mut nodes = Vec::with_capacity(primitives.len());
        for primitive in primitives {
            let geometry: GeometryId = backend.create_geometry(&primitive.geometry)?;
            created.push(ResourceId::Geometry(geometry));

            let material = match primitive.material.and_then(|i| materials.get(i).copied()) {
                Some(material) => material,
                None => match fallback {
                    Some(material) => material,
                    None => {
                        let material = backend.create_material(&MaterialDesc {
                            base_color: DEFAULT_MODEL_COLOR,
                            texture: None,
                        })?;
                        created.push(ResourceId::Material(material));
                        fallback = Some(material);
                        material
                    }
                },
            };

            nodes.push(MeshNode {
                geometry,
                material,
                cast_shadow: false,
                receive_shadow: false,
            });
        }
        meshes.push(nodes);
    }

    Ok(UploadedModel { meshes })
}
