use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::config::ShadowConfig;
use crate::core::{GeometryId, MaterialId};

/// Index of a node inside its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// Local transform; rotation is XYZ Euler angles in radians
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Decompose an affine matrix (e.g. a glTF node transform)
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        let (x, y, z) = rotation.to_euler(EulerRot::XYZ);
        Self {
            translation,
            rotation: Vec3::new(x, y, z),
            scale,
        }
    }

    pub fn quat(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.quat(), self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshNode {
    pub geometry: GeometryId,
    pub material: MaterialId,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AmbientLight {
    pub color: [f32; 3],
    pub intensity: f32,
}

/// Light shining from the node position towards the origin
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    pub color: [f32; 3],
    pub intensity: f32,
    pub cast_shadow: bool,
    pub shadow: ShadowConfig,
}

impl DirectionalLight {
    /// Orthographic transform into shadow-map space for a light at `position`
    ///
    /// The frustum is `shadow.extent` wide on each side of the light axis and
    /// spans `shadow.near..shadow.far` along it, with depth in 0..1.
    pub fn shadow_view_projection(&self, position: Vec3) -> Mat4 {
        let ShadowConfig { near, far, extent, .. } = self.shadow;
        let forward = (-position).try_normalize().unwrap_or(Vec3::NEG_Y);
        let up = if forward.cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let view = Mat4::look_at_rh(position, position + forward, up);
        Mat4::orthographic_rh(-extent, extent, -extent, extent, near, far) * view
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh(MeshNode),
    AmbientLight(AmbientLight),
    DirectionalLight(DirectionalLight),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn as_mesh(&self) -> Option<&MeshNode> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }
}

/// Retained-mode scene graph stored as an arena rooted at node 0
#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: Vec<Node>,
    pub background: [f32; 3],
}

impl SceneGraph {
    pub fn new(background: [f32; 3]) -> Self {
        Self {
            nodes: vec![Node {
                name: "root".to_string(),
                transform: Transform::IDENTITY,
                kind: NodeKind::Group,
                parent: None,
                children: Vec::new(),
            }],
            background,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // The root always exists
        self.nodes.len() == 1
    }

    /// Append a child of `parent`; an unknown parent falls back to the root
    pub fn add(&mut self, parent: NodeId, name: impl Into<String>, transform: Transform, kind: NodeKind) -> NodeId {
        let parent = if parent.0 < self.nodes.len() { parent } else { self.root() };
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.into(),
            transform,
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    /// Product of local transforms from the root down to `id`
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = self.node(id);
        while let Some(node) = current {
            matrix = node.transform.matrix() * matrix;
            current = node.parent.and_then(|p| self.node(p));
        }
        matrix
    }

    /// Depth-first walk of the subtree at `start` with world matrices
    pub fn visit(&self, start: NodeId, mut f: impl FnMut(NodeId, &Node, Mat4)) {
        let Some(start_node) = self.node(start) else {
            return;
        };
        let parent_world = start_node
            .parent
            .map(|p| self.world_matrix(p))
            .unwrap_or(Mat4::IDENTITY);

        let mut stack = vec![(start, parent_world)];
        while let Some((id, parent_world)) = stack.pop() {
            let node = &self.nodes[id.0];
            let world = parent_world * node.transform.matrix();
            f(id, node, world);
            for &child in node.children.iter().rev() {
                stack.push((child, world));
            }
        }
    }

    /// Mutable walk of the subtree at `start`, without matrices
    pub fn traverse_mut(&mut self, start: NodeId, mut f: impl FnMut(&mut Node)) {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get_mut(id.0) else {
                continue;
            };
            f(node);
            stack.extend(node.children.iter().rev().copied());
        }
    }

    /// Every mesh with its world matrix
    pub fn meshes(&self) -> Vec<(NodeId, &MeshNode, Mat4)> {
        let mut out = Vec::new();
        self.visit(self.root(), |id, node, world| {
            if let NodeKind::Mesh(_) = node.kind {
                out.push((id, world));
            }
        });
        out.into_iter()
            .filter_map(|(id, world)| self.nodes[id.0].as_mesh().map(|mesh| (id, mesh, world)))
            .collect()
    }

    pub fn ambient_light(&self) -> Option<&AmbientLight> {
        self.nodes.iter().find_map(|n| match &n.kind {
            NodeKind::AmbientLight(light) => Some(light),
            _ => None,
        })
    }

    /// First directional light and its world-space position
    fn directional_light_node(&self) -> Option<(&DirectionalLight, Vec3)> {
        self.nodes.iter().enumerate().find_map(|(i, n)| match &n.kind {
            NodeKind::DirectionalLight(light) => {
                Some((light, self.world_matrix(NodeId(i)).transform_point3(Vec3::ZERO)))
            }
            _ => None,
        })
    }

    /// First directional light and its world-space direction of travel
    pub fn directional_light(&self) -> Option<(&DirectionalLight, Vec3)> {
        self.directional_light_node().map(|(light, position)| {
            (light, (-position).try_normalize().unwrap_or(Vec3::NEG_Y))
        })
    }

    /// First directional light with shadows on, and its shadow-map transform
    pub fn shadow_caster(&self) -> Option<(&DirectionalLight, Mat4)> {
        self.directional_light_node()
            .filter(|(light, _)| light.cast_shadow)
            .map(|(light, position)| (light, light.shadow_view_projection(position)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh(id: u64) -> NodeKind {
        NodeKind::Mesh(MeshNode {
            geometry: GeometryId(id),
            material: MaterialId(id),
            cast_shadow: false,
            receive_shadow: false,
        })
    }

    #[test]
    fn test_new_graph_has_only_root() {
        let graph = SceneGraph::new([0.0; 3]);
        assert_eq!(graph.len(), 1);
        assert!(graph.is_empty());
        assert!(graph.node(graph.root()).unwrap().parent().is_none());
    }

    #[test]
    fn test_add_links_parent_and_child() {
        let mut graph = SceneGraph::new([0.0; 3]);
        let group = graph.add(graph.root(), "group", Transform::IDENTITY, NodeKind::Group);
        let child = graph.add(group, "child", Transform::IDENTITY, mesh(1));

        assert_eq!(graph.node(child).unwrap().parent(), Some(group));
        assert_eq!(graph.node(group).unwrap().children(), &[child]);
        assert_eq!(graph.find("child"), Some(child));
    }

    #[test]
    fn test_world_matrix_composes_parents() {
        let mut graph = SceneGraph::new([0.0; 3]);
        let group = graph.add(graph.root(), "g", Transform::from_translation(Vec3::new(10.0, 0.0, 0.0)), NodeKind::Group);
        let child = graph.add(group, "c", Transform::from_translation(Vec3::new(0.0, 5.0, 0.0)), mesh(1));

        let world = graph.world_matrix(child);
        assert_eq!(world.transform_point3(Vec3::ZERO), Vec3::new(10.0, 5.0, 0.0));
    }

    #[test]
    fn test_meshes_reports_world_matrices() {
        let mut graph = SceneGraph::new([0.0; 3]);
        let group = graph.add(graph.root(), "g", Transform::from_translation(Vec3::X), NodeKind::Group);
        graph.add(group, "a", Transform::IDENTITY, mesh(1));
        graph.add(graph.root(), "b", Transform::IDENTITY, mesh(2));

        let meshes = graph.meshes();
        assert_eq!(meshes.len(), 2);
        assert_eq!(meshes[0].1.geometry, GeometryId(1));
        assert_eq!(meshes[0].2.transform_point3(Vec3::ZERO), Vec3::X);
        assert_eq!(meshes[1].2, Mat4::IDENTITY);
    }

    #[test]
    fn test_traverse_mut_reaches_subtree_only() {
        let mut graph = SceneGraph::new([0.0; 3]);
        let model = graph.add(graph.root(), "model", Transform::IDENTITY, NodeKind::Group);
        graph.add(model, "a", Transform::IDENTITY, mesh(1));
        let outside = graph.add(graph.root(), "outside", Transform::IDENTITY, mesh(2));

        graph.traverse_mut(model, |node| {
            if let NodeKind::Mesh(m) = &mut node.kind {
                m.cast_shadow = true;
            }
        });

        assert!(graph.node(graph.find("a").unwrap()).unwrap().as_mesh().unwrap().cast_shadow);
        assert!(!graph.node(outside).unwrap().as_mesh().unwrap().cast_shadow);
    }

    #[test]
    fn test_directional_light_points_at_origin() {
        let mut graph = SceneGraph::new([0.0; 3]);
        graph.add(
            graph.root(),
            "sun",
            Transform::from_translation(Vec3::new(0.0, 10.0, 0.0)),
            NodeKind::DirectionalLight(DirectionalLight {
                color: [1.0; 3],
                intensity: 1.0,
                cast_shadow: false,
                shadow: ShadowConfig::default(),
            }),
        );
        let (_, direction) = graph.directional_light().unwrap();
        assert!((direction - Vec3::NEG_Y).length() < 1e-6);
    }

    fn sun(position: Vec3, cast_shadow: bool) -> SceneGraph {
        let mut graph = SceneGraph::new([0.0; 3]);
        graph.add(
            graph.root(),
            "sun",
            Transform::from_translation(position),
            NodeKind::DirectionalLight(DirectionalLight {
                color: [1.0; 3],
                intensity: 2.0,
                cast_shadow,
                shadow: ShadowConfig::default(),
            }),
        );
        graph
    }

    #[test]
    fn test_shadow_caster_requires_cast_shadow() {
        assert!(sun(Vec3::new(30.0, 50.0, 20.0), false).shadow_caster().is_none());
        assert!(sun(Vec3::new(30.0, 50.0, 20.0), true).shadow_caster().is_some());
        assert!(SceneGraph::new([0.0; 3]).shadow_caster().is_none());
    }

    #[test]
    fn test_shadow_matrix_centres_origin() {
        let position = Vec3::new(30.0, 50.0, 20.0);
        let graph = sun(position, true);
        let (_, light_space) = graph.shadow_caster().unwrap();

        let origin = light_space.project_point3(Vec3::ZERO);
        assert!(origin.x.abs() < 1e-5 && origin.y.abs() < 1e-5);
        let expected = (position.length() - 0.5) / (100.0 - 0.5);
        assert!((origin.z - expected).abs() < 1e-4);

        // The light itself sits on the near side, beyond the near plane
        assert!(light_space.project_point3(position).z < 0.0);
    }

    #[test]
    fn test_shadow_matrix_spans_extent() {
        let graph = sun(Vec3::new(0.0, 60.0, 0.0), true);
        let (_, light_space) = graph.shadow_caster().unwrap();

        // Straight overhead: the frustum is 50 units either side of the axis
        let edge = light_space.project_point3(Vec3::new(50.0, 0.0, 0.0));
        assert!((edge.x.abs().max(edge.y.abs()) - 1.0).abs() < 1e-5);
        let inside = light_space.project_point3(Vec3::new(25.0, 0.0, -25.0));
        assert!(inside.x.abs() <= 0.5 + 1e-5 && inside.y.abs() <= 0.5 + 1e-5);
        assert!(inside.is_finite());

        // Far plane at 100 units from the light
        let below = light_space.project_point3(Vec3::new(0.0, -40.0, 0.0));
        assert!((below.z - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_transform_matrix_round_trip() {
        let t = Transform {
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Vec3::new(0.3, 0.2, 0.1),
            scale: Vec3::splat(2.0),
        };
        let back = Transform::from_matrix(t.matrix());
        assert!((back.translation - t.translation).length() < 1e-4);
        assert!((back.rotation - t.rotation).length() < 1e-4);
        assert!((back.scale - t.scale).length() < 1e-4);
    }
}
