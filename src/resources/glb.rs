//! glTF 2.0 binary loading into a CPU-side [`GltfAsset`].
//!
//! Everything the renderer and the animation runtime need is extracted up
//! front: vertex data (with skin attributes normalised), materials, decoded
//! images, the node hierarchy, skins and clips. Accessors are range-checked
//! before they are read; a primitive, skin or channel with a bad accessor is
//! skipped with a warning and the rest of the model still loads.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use cgmath::{InnerSpace, Matrix, Matrix3, Matrix4, SquareMatrix, Vector3, Vector4};
use gltf::accessor::{DataType, Dimensions};

use crate::animation::clip::{Channel, Clip, Interpolation, Keyframes, Path as ChannelPath, Sampler};
use crate::animation::pose::{Node, PoseEvaluator};
use crate::animation::skin::{MAX_JOINTS, Skin};
use crate::data_structures::instance::Trs;
use crate::data_structures::model::{MaterialUniform, MeshData, SkinnedVertex, TextureSlot};
use crate::resources::load_binary;

/// A triangle list with its material and optional skin.
#[derive(Clone, Debug)]
pub struct Primitive {
    pub name: String,
    pub mesh: MeshData<SkinnedVertex>,
    pub material: usize,
    /// Index into [`GltfAsset::skins`]. Skinned primitives stay in mesh space,
    /// everything else has its node's world transform baked in.
    pub skin: Option<usize>,
}

/// PBR factors plus the image index bound to each [`TextureSlot`].
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialDesc {
    pub name: String,
    pub factors: MaterialUniform,
    pub textures: [Option<usize>; 4],
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            factors: MaterialUniform::default(),
            textures: [None; 4],
        }
    }
}

#[derive(Clone, Debug)]
pub struct GltfAsset {
    pub name: String,
    pub nodes: Vec<Node>,
    pub roots: Vec<usize>,
    pub primitives: Vec<Primitive>,
    pub skins: Vec<Skin>,
    pub materials: Vec<MaterialDesc>,
    /// Decoded images; `None` where decoding failed.
    pub images: Vec<Option<image::RgbaImage>>,
    pub clips: Vec<Clip>,
}

impl GltfAsset {
    /// Read and parse a `.glb` (or `.gltf`) file. External buffers and images
    /// resolve relative to the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = load_binary(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());
        let base_dir = path.parent().map(Path::to_path_buf);
        Self::from_glb_bytes(&bytes, &name, base_dir.as_deref())
            .with_context(|| format!("failed to load glTF model {}", path.display()))
    }

    pub fn from_glb_bytes(bytes: &[u8], name: &str, base_dir: Option<&Path>) -> Result<Self> {
        let document = gltf::Gltf::from_slice(bytes).context("invalid glTF document")?;
        let buffers = load_buffers(&document, base_dir);

        let nodes = load_nodes(&document);
        let roots: Vec<usize> = match document.default_scene().or_else(|| document.scenes().next()) {
            Some(scene) => scene.nodes().map(|n| n.index()).collect(),
            None => (0..nodes.len()).filter(|&i| nodes[i].parent.is_none()).collect(),
        };

        let mut rest_pose = PoseEvaluator::new(nodes.clone(), roots.clone());
        rest_pose.evaluate(None, 0.0);

        let skins = load_skins(&document, &buffers);
        let mut materials = load_materials(&document);
        let images = load_images(&document, &buffers, base_dir);

        let mut primitives = Vec::new();
        let mut default_material = None;
        for node in document.nodes() {
            let Some(mesh) = node.mesh() else {
                continue;
            };
            let skin = node.skin().map(|s| s.index()).filter(|&s| s < skins.len());
            let world = rest_pose.globals()[node.index()];
            for primitive in mesh.primitives() {
                let label = format!(
                    "{}/{}#{}",
                    node.name().unwrap_or("node"),
                    mesh.name().unwrap_or("mesh"),
                    primitive.index()
                );
                let palette_len = skin.map(|s| skins[s].palette_len());
                let loaded = match read_primitive(&primitive, &buffers, palette_len) {
                    Ok(loaded) => loaded,
                    Err(e) => {
                        log::warn!("{name}: skipping primitive {label}: {e:#}");
                        continue;
                    }
                };
                let (mut mesh_data, skinned) = loaded;
                let skin = if skinned { skin } else { None };
                if skin.is_none() {
                    bake_transform(&mut mesh_data, &world);
                }
                let material = match primitive.material().index() {
                    Some(index) if index < materials.len() => index,
                    _ => *default_material.get_or_insert_with(|| {
                        materials.push(MaterialDesc::default());
                        materials.len() - 1
                    }),
                };
                primitives.push(Primitive {
                    name: label,
                    mesh: mesh_data,
                    material,
                    skin,
                });
            }
        }

        let clips = load_clips(&document, &buffers);

        log::info!(
            "loaded {name}: {} nodes, {} primitives, {} skins, {} clips",
            nodes.len(),
            primitives.len(),
            skins.len(),
            clips.len()
        );

        Ok(Self {
            name: name.to_string(),
            nodes,
            roots,
            primitives,
            skins,
            materials,
            images,
            clips,
        })
    }

    /// A fresh evaluator over this asset's hierarchy.
    pub fn pose_evaluator(&self) -> PoseEvaluator {
        PoseEvaluator::new(self.nodes.clone(), self.roots.clone())
    }
}

fn load_buffers(document: &gltf::Gltf, base_dir: Option<&Path>) -> Vec<Vec<u8>> {
    document
        .buffers()
        .map(|buffer| match buffer.source() {
            gltf::buffer::Source::Bin => match document.blob.as_deref() {
                Some(blob) => blob.to_vec(),
                None => {
                    log::warn!("buffer {} refers to a missing BIN chunk", buffer.index());
                    Vec::new()
                }
            },
            gltf::buffer::Source::Uri(uri) => match read_external(uri, base_dir) {
                Ok(data) => data,
                Err(e) => {
                    log::warn!("buffer {} ({uri}) could not be read: {e:#}", buffer.index());
                    Vec::new()
                }
            },
        })
        .collect()
}

fn read_external(uri: &str, base_dir: Option<&Path>) -> Result<Vec<u8>> {
    if uri.starts_with("data:") {
        bail!("embedded data URIs are not supported");
    }
    let path = match base_dir {
        Some(dir) => dir.join(uri),
        None => PathBuf::from(uri),
    };
    load_binary(&path)
}

fn load_nodes(document: &gltf::Gltf) -> Vec<Node> {
    let mut nodes: Vec<Node> = document
        .nodes()
        .map(|node| {
            let (translation, rotation, scale) = node.transform().decomposed();
            let mut data = Node::new(
                node.name().unwrap_or("node"),
                Trs::from_gltf(translation, rotation, scale),
            );
            data.children = node.children().map(|c| c.index()).collect();
            data
        })
        .collect();
    for i in 0..nodes.len() {
        for c in 0..nodes[i].children.len() {
            let child = nodes[i].children[c];
            if let Some(node) = nodes.get_mut(child) {
                node.parent = Some(i);
            }
        }
    }
    nodes
}

/// Check that `accessor` can be read without running off its buffer and
/// that its element type is one of `allowed`.
fn validate_accessor(
    accessor: &gltf::Accessor,
    buffers: &[Vec<u8>],
    allowed: &[DataType],
    dimensions: Dimensions,
) -> Result<()> {
    if accessor.sparse().is_some() {
        bail!("accessor {} is sparse", accessor.index());
    }
    if !allowed.contains(&accessor.data_type()) {
        bail!(
            "accessor {} has unsupported component type {:?}",
            accessor.index(),
            accessor.data_type()
        );
    }
    if accessor.dimensions() != dimensions {
        bail!(
            "accessor {} is {:?}, expected {:?}",
            accessor.index(),
            accessor.dimensions(),
            dimensions
        );
    }
    let Some(view) = accessor.view() else {
        bail!("accessor {} has no buffer view", accessor.index());
    };
    let buffer_len = buffers.get(view.buffer().index()).map_or(0, Vec::len);
    let view_end = view.offset().checked_add(view.length());
    if view_end.is_none_or(|end| end > buffer_len) {
        bail!("buffer view {} exceeds its buffer", view.index());
    }
    let count = accessor.count();
    if count == 0 {
        return Ok(());
    }
    let element = accessor.size();
    let stride = view.stride().unwrap_or(element).max(element);
    let needed = (count - 1)
        .checked_mul(stride)
        .and_then(|n| n.checked_add(element))
        .and_then(|n| n.checked_add(accessor.offset()));
    if needed.is_none_or(|end| end > view.length()) {
        bail!("accessor {} exceeds buffer view {}", accessor.index(), view.index());
    }
    Ok(())
}

fn attribute<'a>(primitive: &gltf::Primitive<'a>, semantic: gltf::Semantic) -> Option<gltf::Accessor<'a>> {
    primitive.get(&semantic)
}

/// Returns the vertex data and whether it carries usable skin attributes.
fn read_primitive(
    primitive: &gltf::Primitive,
    buffers: &[Vec<u8>],
    palette_len: Option<usize>,
) -> Result<(MeshData<SkinnedVertex>, bool)> {
    use gltf::Semantic;

    if primitive.mode() != gltf::mesh::Mode::Triangles {
        bail!("mode {:?} is not a triangle list", primitive.mode());
    }

    let Some(positions) = attribute(primitive, Semantic::Positions) else {
        bail!("no POSITION attribute");
    };
    validate_accessor(&positions, buffers, &[DataType::F32], Dimensions::Vec3)?;
    let count = positions.count();

    let check = |semantic: Semantic, allowed: &[DataType], dims: Dimensions| -> Result<bool> {
        match attribute(primitive, semantic.clone()) {
            Some(accessor) => {
                validate_accessor(&accessor, buffers, allowed, dims)?;
                if accessor.count() != count {
                    bail!("{semantic:?} has {} elements, POSITION has {count}", accessor.count());
                }
                Ok(true)
            }
            None => Ok(false),
        }
    };
    let has_normals = check(Semantic::Normals, &[DataType::F32], Dimensions::Vec3)?;
    let has_uvs = check(
        Semantic::TexCoords(0),
        &[DataType::F32, DataType::U8, DataType::U16],
        Dimensions::Vec2,
    )?;
    let has_tangents = check(Semantic::Tangents, &[DataType::F32], Dimensions::Vec4)?;
    let has_skin_attributes = palette_len.is_some()
        && check(Semantic::Joints(0), &[DataType::U8, DataType::U16], Dimensions::Vec4)?
        && check(
            Semantic::Weights(0),
            &[DataType::F32, DataType::U8, DataType::U16],
            Dimensions::Vec4,
        )?;
    if let Some(indices) = primitive.indices() {
        validate_accessor(
            &indices,
            buffers,
            &[DataType::U8, DataType::U16, DataType::U32],
            Dimensions::Scalar,
        )?;
    }

    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let mut vertices: Vec<SkinnedVertex> = match reader.read_positions() {
        Some(iter) => iter
            .map(|position| SkinnedVertex {
                position,
                ..Default::default()
            })
            .collect(),
        None => bail!("POSITION could not be read"),
    };
    if vertices.len() != count {
        bail!("POSITION yielded {} of {count} elements", vertices.len());
    }
    if let (true, Some(normals)) = (has_normals, reader.read_normals()) {
        vertices.iter_mut().zip(normals).for_each(|(v, n)| v.normal = n);
    }
    if let (true, Some(uvs)) = (has_uvs, reader.read_tex_coords(0)) {
        vertices
            .iter_mut()
            .zip(uvs.into_f32())
            .for_each(|(v, uv)| v.tex_coords = uv);
    }
    if let (true, Some(tangents)) = (has_tangents, reader.read_tangents()) {
        vertices.iter_mut().zip(tangents).for_each(|(v, t)| v.tangent = t);
    }

    let mut skinned = false;
    if let (true, Some(palette_len)) = (has_skin_attributes, palette_len) {
        if let (Some(joints), Some(weights)) = (reader.read_joints(0), reader.read_weights(0)) {
            for (vertex, (joints, weights)) in vertices
                .iter_mut()
                .zip(joints.into_u16().zip(weights.into_f32()))
            {
                vertex.joints = joints.map(|j| clamp_joint(j as u32, palette_len));
                vertex.weights = normalize_weights(weights);
            }
            skinned = true;
        }
    }

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..count as u32).collect(),
    };
    let mesh = MeshData { vertices, indices };
    if !mesh.is_valid() {
        bail!("indices do not form triangles over {count} vertices");
    }
    let mut mesh = mesh;
    if !has_normals {
        compute_normals(&mut mesh);
    }
    Ok((mesh, skinned))
}

/// Joint indices outside the palette fall back to joint 0.
pub fn clamp_joint(joint: u32, palette_len: usize) -> u32 {
    if (joint as usize) < palette_len { joint } else { 0 }
}

/// Rescale to a unit sum. Degenerate or non-finite weights bind the vertex
/// fully to its first joint.
pub fn normalize_weights(weights: [f32; 4]) -> [f32; 4] {
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return [1.0, 0.0, 0.0, 0.0];
    }
    let sum: f32 = weights.iter().sum();
    if sum <= 1e-8 || !sum.is_finite() {
        return [1.0, 0.0, 0.0, 0.0];
    }
    weights.map(|w| w / sum)
}

fn compute_normals(mesh: &mut MeshData<SkinnedVertex>) {
    let mut accumulated = vec![Vector3::new(0.0f32, 0.0, 0.0); mesh.vertices.len()];
    for tri in mesh.indices.chunks_exact(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vector3::from(mesh.vertices[i as usize].position));
        let face = (b - a).cross(c - a);
        for &i in tri {
            accumulated[i as usize] += face;
        }
    }
    for (vertex, normal) in mesh.vertices.iter_mut().zip(accumulated) {
        if normal.magnitude2() > f32::EPSILON {
            vertex.normal = normal.normalize().into();
        }
    }
}

fn bake_transform(mesh: &mut MeshData<SkinnedVertex>, world: &Matrix4<f32>) {
    if world.is_identity() {
        return;
    }
    let linear = Matrix3::from_cols(world.x.truncate(), world.y.truncate(), world.z.truncate());
    let normal_matrix = linear.invert().map(|m| m.transpose()).unwrap_or(linear);
    for v in &mut mesh.vertices {
        let p = world * Vector4::new(v.position[0], v.position[1], v.position[2], 1.0);
        v.position = [p.x, p.y, p.z];
        let n = normal_matrix * Vector3::from(v.normal);
        if n.magnitude2() > f32::EPSILON {
            v.normal = n.normalize().into();
        }
        let t = linear * Vector3::new(v.tangent[0], v.tangent[1], v.tangent[2]);
        if t.magnitude2() > f32::EPSILON {
            let t = t.normalize();
            v.tangent = [t.x, t.y, t.z, v.tangent[3]];
        }
    }
}

fn load_skins(document: &gltf::Gltf, buffers: &[Vec<u8>]) -> Vec<Skin> {
    document
        .skins()
        .map(|skin| {
            let name = skin.name().unwrap_or("skin").to_string();
            let joints: Vec<usize> = skin.joints().map(|j| j.index()).collect();
            if joints.len() > MAX_JOINTS {
                log::warn!(
                    "skin `{name}` has {} joints, only the first {MAX_JOINTS} are animated",
                    joints.len()
                );
            }
            let inverse_bind = match skin.inverse_bind_matrices() {
                Some(accessor) => {
                    match validate_accessor(&accessor, buffers, &[DataType::F32], Dimensions::Mat4) {
                        Ok(()) => skin
                            .reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice))
                            .read_inverse_bind_matrices()
                            .map(|iter| iter.map(Matrix4::from).collect())
                            .unwrap_or_default(),
                        Err(e) => {
                            log::warn!("skin `{name}`: ignoring inverse bind matrices: {e:#}");
                            Vec::new()
                        }
                    }
                }
                None => Vec::new(),
            };
            Skin::new(name, joints, inverse_bind)
        })
        .collect()
}

fn load_materials(document: &gltf::Gltf) -> Vec<MaterialDesc> {
    document
        .materials()
        .map(|material| {
            let pbr = material.pbr_metallic_roughness();
            let normal = material.normal_texture();
            let occlusion = material.occlusion_texture();
            let mut textures = [None; 4];
            textures[TextureSlot::BaseColor as usize] =
                pbr.base_color_texture().map(|t| t.texture().source().index());
            textures[TextureSlot::MetallicRoughness as usize] = pbr
                .metallic_roughness_texture()
                .map(|t| t.texture().source().index());
            textures[TextureSlot::Normal as usize] =
                normal.as_ref().map(|t| t.texture().source().index());
            textures[TextureSlot::Occlusion as usize] =
                occlusion.as_ref().map(|t| t.texture().source().index());
            MaterialDesc {
                name: material.name().unwrap_or("material").to_string(),
                factors: MaterialUniform::new(
                    pbr.base_color_factor(),
                    pbr.metallic_factor(),
                    pbr.roughness_factor(),
                    occlusion.as_ref().map_or(1.0, |o| o.strength()),
                    normal.as_ref().map_or(1.0, |n| n.scale()),
                ),
                textures,
            }
        })
        .collect()
}

fn load_images(
    document: &gltf::Gltf,
    buffers: &[Vec<u8>],
    base_dir: Option<&Path>,
) -> Vec<Option<image::RgbaImage>> {
    document
        .images()
        .map(|img| {
            let bytes = match img.source() {
                gltf::image::Source::View { view, .. } => {
                    let start = view.offset();
                    let end = start.saturating_add(view.length());
                    buffers
                        .get(view.buffer().index())
                        .and_then(|b| b.get(start..end))
                        .map(<[u8]>::to_vec)
                        .ok_or_else(|| anyhow!("image view {} exceeds its buffer", view.index()))
                }
                gltf::image::Source::Uri { uri, .. } => read_external(uri, base_dir),
            };
            match bytes.and_then(|b| Ok(image::load_from_memory(&b)?)) {
                Ok(decoded) => Some(decoded.to_rgba8()),
                Err(e) => {
                    log::warn!("image {} could not be decoded: {e:#}", img.index());
                    None
                }
            }
        })
        .collect()
}

fn load_clips(document: &gltf::Gltf, buffers: &[Vec<u8>]) -> Vec<Clip> {
    document
        .animations()
        .map(|animation| {
            let name = animation
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("clip_{}", animation.index()));
            let mut samplers = Vec::new();
            let mut channels = Vec::new();
            for (index, channel) in animation.channels().enumerate() {
                match read_channel(&channel, buffers) {
                    Ok((sampler, path)) => {
                        channels.push(Channel {
                            sampler: samplers.len(),
                            target_node: channel.target().node().index(),
                            path,
                        });
                        samplers.push(sampler);
                    }
                    Err(e) => log::warn!("clip `{name}`: skipping channel {index}: {e:#}"),
                }
            }
            Clip::new(name, samplers, channels)
        })
        .collect()
}

fn read_channel(channel: &gltf::animation::Channel, buffers: &[Vec<u8>]) -> Result<(Sampler, ChannelPath)> {
    use gltf::animation::Property;
    use gltf::animation::util::ReadOutputs;

    let (path, dims) = match channel.target().property() {
        Property::Translation => (ChannelPath::Translation, Dimensions::Vec3),
        Property::Rotation => (ChannelPath::Rotation, Dimensions::Vec4),
        Property::Scale => (ChannelPath::Scale, Dimensions::Vec3),
        Property::MorphTargetWeights => bail!("morph target weights are not supported"),
    };
    let sampler = channel.sampler();
    validate_accessor(&sampler.input(), buffers, &[DataType::F32], Dimensions::Scalar)?;
    let output_types: &[DataType] = match path {
        ChannelPath::Rotation => &[DataType::F32, DataType::I8, DataType::U8, DataType::I16, DataType::U16],
        _ => &[DataType::F32],
    };
    validate_accessor(&sampler.output(), buffers, output_types, dims)?;

    let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
    let input: Vec<f32> = reader
        .read_inputs()
        .ok_or_else(|| anyhow!("sampler input could not be read"))?
        .collect();
    let output = match reader.read_outputs() {
        Some(ReadOutputs::Translations(t)) => Keyframes::Translation(t.map(Vector3::from).collect()),
        Some(ReadOutputs::Scales(s)) => Keyframes::Scale(s.map(Vector3::from).collect()),
        Some(ReadOutputs::Rotations(r)) => Keyframes::Rotation(
            r.into_f32()
                .map(|[x, y, z, w]| cgmath::Quaternion::new(w, x, y, z))
                .collect(),
        ),
        Some(ReadOutputs::MorphTargetWeights(_)) => bail!("morph target weights are not supported"),
        None => bail!("sampler output could not be read"),
    };
    let interpolation = Interpolation::from(sampler.interpolation());
    Ok((Sampler::new(input, output, interpolation)?, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_are_renormalised() {
        let w = normalize_weights([2.0, 1.0, 1.0, 0.0]);
        assert_eq!(w, [0.5, 0.25, 0.25, 0.0]);
        assert_eq!(normalize_weights([f32::NAN, 0.5, 0.0, 0.0]), [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(normalize_weights([0.0; 4]), [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn out_of_range_joints_clamp_to_zero() {
        assert_eq!(clamp_joint(3, 4), 3);
        assert_eq!(clamp_joint(4, 4), 0);
        assert_eq!(clamp_joint(70, 64), 0);
    }
}
