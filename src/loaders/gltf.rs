use anyhow::{Context, Result};
use glam::Mat4;
use log::{debug, info, warn};
use std::path::Path;

use crate::core::TextureData;
use crate::math::linear_to_srgb;
use crate::scene::{GeometryData, Transform};

/// One node of the imported hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct ModelNode {
    pub name: String,
    pub transform: Transform,
    /// Index into `ModelData::meshes`
    pub mesh: Option<usize>,
    pub children: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelPrimitive {
    pub geometry: GeometryData,
    /// Index into `ModelData::materials`
    pub material: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelMaterial {
    /// sRGB-encoded colour, linear alpha
    pub base_color: [f32; 4],
    /// Index into `ModelData::textures`
    pub texture: Option<usize>,
}

/// CPU-side copy of an imported scene, not yet uploaded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelData {
    pub nodes: Vec<ModelNode>,
    /// Top-level nodes of the displayed scene
    pub roots: Vec<usize>,
    pub meshes: Vec<Vec<ModelPrimitive>>,
    pub materials: Vec<ModelMaterial>,
    pub textures: Vec<TextureData>,
}

impl ModelData {
    pub fn primitive_count(&self) -> usize {
        self.meshes.iter().map(Vec::len).sum()
    }
}

/// Parse a .gltf or .glb document; `base` resolves external buffers and images
pub fn parse_model(bytes: &[u8], base: Option<&Path>) -> Result<ModelData> {
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes).context("Invalid glTF document")?;
    let buffers = gltf::import_buffers(&document, base, blob).context("Failed to load glTF buffers")?;
    let images = gltf::import_images(&document, base, &buffers).context("Failed to load glTF images")?;

    debug!(
        "glTF: {} scenes, {} nodes, {} meshes, {} materials, {} images",
        document.scenes().count(),
        document.nodes().count(),
        document.meshes().count(),
        document.materials().count(),
        images.len()
    );

    let nodes = document
        .nodes()
        .map(|node| ModelNode {
            name: node
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("node {}", node.index())),
            transform: Transform::from_matrix(Mat4::from_cols_array_2d(&node.transform().matrix())),
            mesh: node.mesh().map(|m| m.index()),
            children: node.children().map(|c| c.index()).collect(),
        })
        .collect();

    let roots = match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => scene.nodes().map(|n| n.index()).collect(),
        None => {
            warn!("glTF document has no scene; nothing will be displayed");
            Vec::new()
        }
    };

    let meshes = document
        .meshes()
        .map(|mesh| read_mesh(&mesh, &buffers))
        .collect::<Result<Vec<_>>>()?;

    let materials = document
        .materials()
        .map(|material| {
            let pbr = material.pbr_metallic_roughness();
            let [r, g, b, a] = pbr.base_color_factor();
            let [r, g, b] = linear_to_srgb([r, g, b]);
            ModelMaterial {
                base_color: [r, g, b, a],
                texture: pbr.base_color_texture().map(|info| info.texture().source().index()),
            }
        })
        .collect();

    let textures = images.iter().map(to_rgba).collect();

    let model = ModelData {
        nodes,
        roots,
        meshes,
        materials,
        textures,
    };
    info!(
        "glTF parsed: {} nodes, {} primitives, {} textures",
        model.nodes.len(),
        model.primitive_count(),
        model.textures.len()
    );
    Ok(model)
}

fn read_mesh(mesh: &gltf::Mesh, buffers: &[gltf::buffer::Data]) -> Result<Vec<ModelPrimitive>> {
    let mut primitives = Vec::new();

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            warn!("Skipping non-triangle primitive in mesh {:?}", mesh.name());
            continue;
        }

        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .context("Mesh primitive has no positions")?
            .collect();
        if positions.is_empty() {
            continue;
        }

        let indices = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };

        let mut geometry = GeometryData {
            normals: reader.read_normals().map(|n| n.collect()).unwrap_or_default(),
            uvs: reader
                .read_tex_coords(0)
                .map(|uv| uv.into_f32().collect())
                .unwrap_or_default(),
            positions,
            indices,
        };
        geometry.ensure_normals();
        geometry.ensure_uvs();

        primitives.push(ModelPrimitive {
            geometry,
            material: primitive.material().index(),
        });
    }

    Ok(primitives)
}

fn to_rgba(image: &gltf::image::Data) -> TextureData {
    use gltf::image::Format;

    let rgba = match image.format {
        Format::R8G8B8A8 => image.pixels.clone(),
        Format::R8G8B8 => image
            .pixels
            .chunks_exact(3)
            .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], 255])
            .collect(),
        Format::R8G8 => image
            .pixels
            .chunks_exact(2)
            .flat_map(|rg| [rg[0], rg[1], 0, 255])
            .collect(),
        Format::R8 => image.pixels.iter().flat_map(|&l| [l, l, l, 255]).collect(),
        other => {
            warn!("Unsupported texture format {:?}, using white", other);
            vec![255; image.width as usize * image.height as usize * 4]
        }
    };

    TextureData {
        width: image.width,
        height: image.height,
        rgba,
    }
}
