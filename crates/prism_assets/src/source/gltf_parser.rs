use std::{
    collections::{HashMap, HashSet},
    ops::Range,
    path::Path,
};

use glam::{DMat4, Quat, Vec3};
use gltf::{
    animation::{Interpolation, util::ReadOutputs},
    buffer::Data as BufferData,
    image::Source,
    material::AlphaMode,
    mesh::Mode,
};
use log::{debug, info, warn};

use crate::{
    ImportError, Result,
    imported::{
        ImportedAnimation, ImportedBone, ImportedChannel, ImportedMaterial, ImportedMesh,
        ImportedNode, ImportedScene, ImportedTexture, Key, ShadingModel, TexCoordChannel,
        TextureContent, TextureRole, VertexWeight,
    },
};

/// glTF joints/weights sets read per primitive. The mesh builder keeps four
/// influences, the rest only matter for counting what gets dropped.
const MAX_SKIN_SETS: u32 = 2;
const MAX_UV_SETS: u32 = 8;

struct SkinInfo {
    joints: Vec<String>,
    inverse_bind: Vec<DMat4>,
}

pub fn parse_gltf(path: &Path) -> Result<ImportedScene> {
    let base_path = path.parent().unwrap_or(Path::new("./"));

    // A. Load Document & Buffers. Images are decoded later, on demand.
    let gltf::Gltf { document, blob } = gltf::Gltf::open(path)?;
    let buffers = gltf::import_buffers(&document, Some(base_path), blob)?;

    // --- STEP 1: NODE NAMES ---
    // Bones and animation channels refer to nodes by name, so make them unique
    let mut taken = HashSet::new();
    let node_names = unique_node_names(&document, &mut taken);

    // --- STEP 2: TEXTURES ---
    let (textures, image_refs) = read_images(&document, &buffers);

    // --- STEP 3: MATERIALS ---
    let mut materials: Vec<ImportedMaterial> = document
        .materials()
        .map(|mat| read_material(&mat, &image_refs))
        .collect();
    let default_material = materials.len();
    let mut needs_default_material = false;

    // --- STEP 4: MESHES ---
    let skins = read_skins(&document, &buffers, &node_names);
    let mut mesh_skin: HashMap<usize, usize> = HashMap::new();
    for node in document.nodes() {
        if let (Some(mesh), Some(skin)) = (node.mesh(), node.skin()) {
            let previous = *mesh_skin.entry(mesh.index()).or_insert(skin.index());
            if previous != skin.index() {
                warn!(
                    "Mesh {} is bound to several skins, keeping skin {previous}",
                    mesh.index()
                );
            }
        }
    }

    let mut meshes = Vec::new();
    // Maps glTF mesh index -> range of imported meshes (one per primitive)
    let mut mesh_ranges: Vec<Range<usize>> = Vec::new();

    for mesh in document.meshes() {
        let start = meshes.len();
        let skin = mesh_skin.get(&mesh.index()).map(|&s| &skins[s]);

        for primitive in mesh.primitives() {
            let material_index = match primitive.material().index() {
                Some(index) => index,
                None => {
                    needs_default_material = true;
                    default_material
                }
            };
            let name = match mesh.name() {
                Some(name) => format!("{name}_{}", primitive.index()),
                None => format!("mesh_{}_{}", mesh.index(), primitive.index()),
            };
            meshes.push(read_primitive(&primitive, &buffers, name, skin, material_index)?);
        }

        mesh_ranges.push(start..meshes.len());
    }

    if needs_default_material {
        materials.push(ImportedMaterial {
            name: "DefaultMaterial".into(),
            ..Default::default()
        });
    }

    // --- STEP 5: NODES (The Hierarchy) ---
    let mut nodes: Vec<ImportedNode> = document
        .nodes()
        .map(|node| {
            let cols = node.transform().matrix().map(|c| c.map(f64::from));
            ImportedNode {
                name: node_names[node.index()].clone(),
                transform: DMat4::from_cols_array_2d(&cols),
                meshes: node
                    .mesh()
                    .map(|m| mesh_ranges[m.index()].clone().collect())
                    .unwrap_or_default(),
                children: node.children().map(|c| c.index()).collect(),
            }
        })
        .collect();

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| ImportError::InvalidInput(format!("{} has no scene", path.display())))?;

    let roots: Vec<usize> = scene.nodes().map(|n| n.index()).collect();
    let root = match roots.as_slice() {
        [] => {
            return Err(ImportError::InvalidInput(format!(
                "{} has an empty scene",
                path.display()
            )));
        }
        [single] => *single,
        _ => {
            // Several roots: group them under an identity node. Its name must
            // not shadow a real node, channels and bones resolve by name.
            let name = claim_name(&mut taken, scene.name().unwrap_or("Root"), nodes.len());
            let mut group = ImportedNode::new(name);
            group.children = roots;
            nodes.push(group);
            nodes.len() - 1
        }
    };

    // --- STEP 6: ANIMATIONS ---
    let animations = read_animations(&document, &buffers, &node_names);

    info!(
        "Parsed {}: {} meshes, {} materials, {} embedded textures, {} nodes, {} animations",
        path.display(),
        meshes.len(),
        materials.len(),
        textures.len(),
        nodes.len(),
        animations.len()
    );

    Ok(ImportedScene {
        meshes,
        materials,
        textures,
        nodes,
        root,
        animations,
    })
}

fn unique_node_names(document: &gltf::Document, taken: &mut HashSet<String>) -> Vec<String> {
    document
        .nodes()
        .map(|node| match node.name() {
            Some(name) => claim_name(taken, name, node.index()),
            None => claim_name(taken, &format!("node_{}", node.index()), node.index()),
        })
        .collect()
}

/// Returns `base`, or `base_<index>` (then `base_<index>_<n>`) if taken.
fn claim_name(taken: &mut HashSet<String>, base: &str, index: usize) -> String {
    let mut name = base.to_owned();
    let mut n = 0;
    while taken.contains(&name) {
        name = match n {
            0 => format!("{base}_{index}"),
            _ => format!("{base}_{index}_{n}"),
        };
        n += 1;
    }
    if name != base {
        debug!("Duplicate node name '{base}' renamed to '{name}'");
    }
    taken.insert(name.clone());
    name
}

/// Returns the embedded texture table and, per glTF image, the reference a
/// material should use for it.
fn read_images(
    document: &gltf::Document,
    buffers: &[BufferData],
) -> (Vec<ImportedTexture>, Vec<Option<String>>) {
    let mut textures = Vec::new();
    let mut refs = Vec::new();

    for image in document.images() {
        match image.source() {
            Source::View { view, mime_type } => {
                let start = view.offset();
                let end = start + view.length();
                let Some(bytes) = buffers
                    .get(view.buffer().index())
                    .and_then(|b| b.0.get(start..end))
                else {
                    warn!("Image {} points outside of its buffer", image.index());
                    refs.push(None);
                    continue;
                };

                let format_hint = match mime_type {
                    "image/png" => "png".to_owned(),
                    "image/jpeg" => "jpg".to_owned(),
                    other => other.rsplit('/').next().unwrap_or(other).to_owned(),
                };

                textures.push(ImportedTexture {
                    filename: image.name().map(str::to_owned),
                    content: TextureContent::Compressed {
                        data: bytes.to_vec(),
                        format_hint,
                    },
                });
                refs.push(Some(format!("*{}", textures.len() - 1)));
            }
            Source::Uri { uri, .. } => {
                if uri.starts_with("data:") {
                    warn!("Image {}: data URIs are not supported", image.index());
                    refs.push(None);
                } else {
                    // URIs are percent-encoded, paths on disk are not
                    let path = urlencoding::decode(uri).map_or_else(
                        |e| {
                            warn!("Image {}: cannot decode URI '{uri}': {e}", image.index());
                            uri.to_owned()
                        },
                        |path| path.into_owned(),
                    );
                    refs.push(Some(path));
                }
            }
        }
    }

    (textures, refs)
}

fn read_material(mat: &gltf::Material, image_refs: &[Option<String>]) -> ImportedMaterial {
    let pbr = mat.pbr_metallic_roughness();
    let reference = |image: gltf::Image| image_refs.get(image.index()).cloned().flatten();

    let mut textures = Vec::new();
    if let Some(r) = pbr
        .base_color_texture()
        .and_then(|info| reference(info.texture().source()))
    {
        textures.push((TextureRole::Diffuse, r.clone()));
        textures.push((TextureRole::BaseColor, r));
    }
    if let Some(r) = mat
        .normal_texture()
        .and_then(|info| reference(info.texture().source()))
    {
        textures.push((TextureRole::Normal, r));
    }
    if let Some(r) = mat
        .emissive_texture()
        .and_then(|info| reference(info.texture().source()))
    {
        textures.push((TextureRole::Emissive, r));
    }

    let base_color = pbr.base_color_factor();
    let opacity = match mat.alpha_mode() {
        AlphaMode::Opaque => 1.0,
        AlphaMode::Mask | AlphaMode::Blend => base_color[3],
    };

    ImportedMaterial {
        name: mat
            .name()
            .map(str::to_owned)
            .unwrap_or_else(|| format!("material_{}", mat.index().unwrap_or_default())),
        shading_model: Some(if mat.unlit() {
            ShadingModel::NoShading
        } else {
            ShadingModel::PbrBrdf
        }),
        opacity: Some(opacity),
        diffuse: Some(base_color),
        specular: None,
        ambient: None,
        textures,
    }
}

fn read_skins(
    document: &gltf::Document,
    buffers: &[BufferData],
    node_names: &[String],
) -> Vec<SkinInfo> {
    document
        .skins()
        .map(|skin| {
            let joints: Vec<String> = skin
                .joints()
                .map(|j| node_names[j.index()].clone())
                .collect();
            let reader = skin.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
            let mut inverse_bind: Vec<DMat4> = reader
                .read_inverse_bind_matrices()
                .map(|iter| {
                    iter.map(|m| DMat4::from_cols_array_2d(&m.map(|c| c.map(f64::from))))
                        .collect()
                })
                .unwrap_or_default();
            inverse_bind.resize(joints.len(), DMat4::IDENTITY);
            SkinInfo {
                joints,
                inverse_bind,
            }
        })
        .collect()
}

fn read_primitive(
    primitive: &gltf::Primitive,
    buffers: &[BufferData],
    name: String,
    skin: Option<&SkinInfo>,
    material_index: usize,
) -> Result<ImportedMesh> {
    let reader = primitive.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .map(|iter| iter.collect())
        .ok_or_else(|| ImportError::InvalidInput(format!("primitive '{name}' has no positions")))?;
    let vertex_count = positions.len();

    let normals = reader.read_normals().map(|iter| iter.collect());
    let tangents = reader
        .read_tangents()
        .map(|iter| iter.map(|[x, y, z, _]| [x, y, z]).collect());

    let tex_coords = (0..MAX_UV_SETS)
        .map_while(|set| reader.read_tex_coords(set))
        .map(|tc| TexCoordChannel {
            components: 2,
            coords: tc.into_f32().map(|[u, v]| [u, v, 0.0]).collect(),
        })
        .collect();

    let colors = reader
        .read_colors(0)
        .map(|c| vec![c.into_rgba_f32().collect()])
        .unwrap_or_default();

    let indices: Vec<u32> = reader
        .read_indices()
        .map(|read| read.into_u32().collect())
        .unwrap_or_else(|| (0..vertex_count as u32).collect());

    let faces = faces_for_mode(primitive.mode(), &indices);

    let mut bones = Vec::new();
    if let Some(skin) = skin {
        bones = skin
            .joints
            .iter()
            .zip(&skin.inverse_bind)
            .map(|(joint, ibm)| ImportedBone {
                name: joint.clone(),
                offset_matrix: *ibm,
                weights: Vec::new(),
            })
            .collect();

        for set in 0..MAX_SKIN_SETS {
            let (Some(joints), Some(weights)) = (reader.read_joints(set), reader.read_weights(set))
            else {
                break;
            };
            for (vertex, (j, w)) in joints.into_u16().zip(weights.into_f32()).enumerate() {
                for k in 0..4 {
                    if w[k] <= 0.0 {
                        continue;
                    }
                    match bones.get_mut(j[k] as usize) {
                        Some(bone) => bone.weights.push(VertexWeight {
                            vertex: vertex as u32,
                            weight: w[k],
                        }),
                        None => warn!("Primitive '{name}' references missing joint {}", j[k]),
                    }
                }
            }
        }
    }

    Ok(ImportedMesh {
        name,
        positions,
        normals,
        tex_coords,
        tangents,
        colors,
        faces,
        bones,
        material_index,
    })
}

/// Expands a primitive's index list into point, line and triangle faces.
fn faces_for_mode(mode: Mode, idx: &[u32]) -> Vec<Vec<u32>> {
    match mode {
        Mode::Points => idx.iter().map(|&i| vec![i]).collect(),
        Mode::Lines => idx.chunks_exact(2).map(<[u32]>::to_vec).collect(),
        Mode::LineStrip => idx.windows(2).map(<[u32]>::to_vec).collect(),
        Mode::LineLoop => {
            let mut lines: Vec<Vec<u32>> = idx.windows(2).map(<[u32]>::to_vec).collect();
            if let (Some(&first), Some(&last)) = (idx.first(), idx.last()) {
                if idx.len() > 2 {
                    lines.push(vec![last, first]);
                }
            }
            lines
        }
        Mode::Triangles => idx.chunks_exact(3).map(<[u32]>::to_vec).collect(),
        Mode::TriangleStrip => (0..idx.len().saturating_sub(2))
            .map(|i| {
                if i % 2 == 0 {
                    vec![idx[i], idx[i + 1], idx[i + 2]]
                } else {
                    vec![idx[i + 1], idx[i], idx[i + 2]]
                }
            })
            .collect(),
        Mode::TriangleFan => (1..idx.len().saturating_sub(1))
            .map(|i| vec![idx[0], idx[i], idx[i + 1]])
            .collect(),
    }
}

fn read_animations(
    document: &gltf::Document,
    buffers: &[BufferData],
    node_names: &[String],
) -> Vec<ImportedAnimation> {
    let mut animations = Vec::new();

    for anim in document.animations() {
        let name = anim
            .name()
            .map(str::to_owned)
            .unwrap_or_else(|| format!("animation_{}", anim.index()));

        let mut channels: Vec<ImportedChannel> = Vec::new();
        let mut by_node: HashMap<usize, usize> = HashMap::new();
        let mut duration = 0.0f64;

        for channel in anim.channels() {
            let node = channel.target().node().index();
            let reader = channel.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));

            let Some(inputs) = reader.read_inputs() else {
                continue;
            };
            let times: Vec<f64> = inputs.map(f64::from).collect();
            if let Some(&last) = times.last() {
                duration = duration.max(last);
            }

            let interpolation = channel.sampler().interpolation();
            if matches!(interpolation, Interpolation::Step) {
                warn!("Animation '{name}': step interpolation is sampled linearly");
            }
            let cubic = matches!(interpolation, Interpolation::CubicSpline);

            let Some(outputs) = reader.read_outputs() else {
                continue;
            };

            let slot = *by_node.entry(node).or_insert_with(|| {
                channels.push(ImportedChannel::new(node_names[node].clone()));
                channels.len() - 1
            });
            let target = &mut channels[slot];

            match outputs {
                ReadOutputs::Translations(it) => {
                    target.position_keys = keyed(&times, it.map(Vec3::from), cubic);
                }
                ReadOutputs::Rotations(it) => {
                    target.rotation_keys = keyed(&times, it.into_f32().map(Quat::from_array), cubic);
                }
                ReadOutputs::Scales(it) => {
                    target.scaling_keys = keyed(&times, it.map(Vec3::from), cubic);
                }
                ReadOutputs::MorphTargetWeights(_) => {
                    debug!("Animation '{name}': skipping morph target weights");
                }
            }
        }

        animations.push(ImportedAnimation {
            name,
            // glTF key times are in seconds
            ticks_per_second: 1.0,
            duration,
            channels,
        });
    }

    animations
}

/// Pairs key times with values. Cubic-spline samplers store
/// (in-tangent, value, out-tangent) triplets; only the values are kept.
fn keyed<T>(times: &[f64], values: impl Iterator<Item = T>, cubic: bool) -> Vec<Key<T>> {
    let values: Vec<T> = values.collect();
    let values: Vec<T> = if cubic && values.len() == times.len() * 3 {
        values.into_iter().skip(1).step_by(3).collect()
    } else {
        values
    };
    times
        .iter()
        .copied()
        .zip(values)
        .map(|(time, value)| Key::new(time, value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_and_fans_expand_to_triangles() {
        let idx = [0, 1, 2, 3];
        assert_eq!(
            faces_for_mode(Mode::TriangleStrip, &idx),
            vec![vec![0, 1, 2], vec![2, 1, 3]]
        );
        assert_eq!(
            faces_for_mode(Mode::TriangleFan, &idx),
            vec![vec![0, 1, 2], vec![0, 2, 3]]
        );
        assert!(faces_for_mode(Mode::TriangleFan, &idx[..1]).is_empty());
    }

    #[test]
    fn lines_and_points_keep_their_arity() {
        let idx = [4, 5, 6];
        assert_eq!(faces_for_mode(Mode::Points, &idx).len(), 3);
        assert_eq!(faces_for_mode(Mode::Lines, &idx), vec![vec![4, 5]]);
        assert_eq!(
            faces_for_mode(Mode::LineLoop, &idx),
            vec![vec![4, 5], vec![5, 6], vec![6, 4]]
        );
    }

    #[test]
    fn cubic_spline_keeps_middle_values() {
        let keys = keyed(&[0.0, 1.0], [9.0, 1.0, 9.0, 9.0, 2.0, 9.0].into_iter(), true);
        assert_eq!(keys, vec![Key::new(0.0, 1.0), Key::new(1.0, 2.0)]);
    }

    #[test]
    fn taken_names_get_the_index_suffix() {
        let mut taken = HashSet::new();
        assert_eq!(claim_name(&mut taken, "Root", 0), "Root");
        assert_eq!(claim_name(&mut taken, "Root", 3), "Root_3");
        taken.insert("Root_5".to_owned());
        assert_eq!(claim_name(&mut taken, "Root", 5), "Root_5_1");
        assert_eq!(taken.len(), 4);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = parse_gltf(Path::new("/definitely/not/here.gltf")).unwrap_err();
        assert!(matches!(err, ImportError::Io(_) | ImportError::Gltf(_)));
    }
}
