use std::collections::HashSet;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose, Engine as _};
use gltf::mesh::Mode;

use crate::core::attribute::{Attribute, AttributeType};
use crate::core::material::{Material, TransparencyMode};
use crate::core::mesh::Mesh;
use crate::core::scene::{MeshGroup, MeshInstance, NodeTransform, Scene, SceneNode};
use crate::core::texture::{self, Image, Sampler, Texture, TextureRef};
use crate::io::gltf::PrimitiveExtras;
use crate::io::scene_io::SceneDecoder;

#[remain::sorted]
#[derive(Debug, Clone, thiserror::Error)]
pub enum Err {
    #[error("Attribute Error: {0}")]
    AttributeError(#[from] crate::core::attribute::Err),
    #[error("Invalid Input: {0}")]
    InvalidInput(String),
    #[error("IO Error: {0}")]
    IoError(String),
    #[error("Failed to load glTF file: {0}")]
    LoadError(String),
    #[error("Mesh Error: {0}")]
    MeshError(#[from] crate::core::mesh::Err),
    #[error("Scene Error: {0}")]
    SceneError(#[from] crate::core::scene::Err),
    #[error("Unsupported feature: {0}")]
    Unsupported(String),
}

/// Decodes a glTF 2.0 asset (`.gltf` or `.glb`) into a [`Scene`].
///
/// Image data is kept in its encoded form. Triangle primitives are supported;
/// animations, skins, cameras and morph targets are dropped with a warning.
#[derive(Debug, Default)]
pub struct GltfDecoder {
    // Directory used to resolve relative URIs. `None` when decoding from
    // memory, in which case only data URIs and the GLB blob can be used.
    base_dir: Option<PathBuf>,

    // Files read while decoding the last asset.
    input_files: Vec<PathBuf>,
}

impl SceneDecoder for GltfDecoder {
    type Error = Err;

    fn decode_file_to_scene(&mut self, file_name: &Path) -> Result<Scene, Err> {
        let data = std::fs::read(file_name)
            .map_err(|e| Err::IoError(format!("Failed to read {}: {}", file_name.display(), e)))?;
        self.base_dir = Some(file_name.parent().map(Path::to_path_buf).unwrap_or_default());
        self.input_files = vec![file_name.to_path_buf()];
        self.decode_gltf_to_scene(&data)
    }

    fn decode_buffer_to_scene(&mut self, buffer: &[u8]) -> Result<Scene, Err> {
        self.base_dir = None;
        self.input_files.clear();
        self.decode_gltf_to_scene(buffer)
    }
}

impl GltfDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths of all files read while decoding the last asset, starting with
    /// the asset itself. Empty after decoding from a buffer without external
    /// references.
    pub fn input_files(&self) -> &[PathBuf] {
        &self.input_files
    }

    fn decode_gltf_to_scene(&mut self, data: &[u8]) -> Result<Scene, Err> {
        let gltf::Gltf { document, blob } =
            gltf::Gltf::from_slice(data).map_err(|e| Err::LoadError(e.to_string()))?;
        self.check_unsupported_features(&document)?;

        for buffer in document.buffers() {
            if let gltf::buffer::Source::Uri(uri) = buffer.source() {
                self.track_external_uri(uri);
            }
        }
        let buffers = gltf::import_buffers(&document, self.base_dir.as_deref(), blob)
            .map_err(|e| Err::LoadError(format!("Failed to import buffers: {}", e)))?;

        let mut scene = Scene::new();
        scene.set_copyright(document.as_json().asset.copyright.clone());

        for image in document.images() {
            let image = self.decode_image(&image, &buffers)?;
            scene.add_image(image);
        }
        for gltf_texture in document.textures() {
            let texture = Texture::new(gltf_texture.source().index())
                .with_sampler(decode_sampler(&gltf_texture.sampler()));
            scene.add_texture(texture);
        }
        for gltf_material in document.materials() {
            scene.add_material(decode_material(&gltf_material));
        }
        for gltf_mesh in document.meshes() {
            let mut group = MeshGroup::new();
            group.set_name(gltf_mesh.name().map(str::to_string));
            for primitive in gltf_mesh.primitives() {
                let mut mesh = decode_primitive(&primitive, &buffers)?;
                mesh.set_name(gltf_mesh.name().map(str::to_string));
                let mesh_index = scene.add_mesh(mesh);
                group.add_mesh_instance(MeshInstance::new(mesh_index, primitive.material().index()));
            }
            scene.add_mesh_group(group);
        }
        self.decode_scene_nodes(&document, &mut scene);

        scene.validate()?;
        tracing::debug!(
            meshes = scene.num_meshes(),
            nodes = scene.nodes().len(),
            materials = scene.materials().len(),
            images = scene.images().len(),
            "decoded glTF scene"
        );
        Ok(scene)
    }

    fn check_unsupported_features(&self, document: &gltf::Document) -> Result<(), Err> {
        if let Some(extension) = document.extensions_required().next() {
            return Err(Err::Unsupported(format!(
                "Required extension {} is not supported.",
                extension
            )));
        }
        let animations = document.animations().count();
        if animations > 0 {
            tracing::warn!(animations, "animations are not transcoded and will be dropped");
        }
        let skins = document.skins().count();
        if skins > 0 {
            tracing::warn!(skins, "skins are not transcoded and will be dropped");
        }
        let cameras = document.cameras().count();
        if cameras > 0 {
            tracing::warn!(cameras, "cameras are not transcoded and will be dropped");
        }
        let scenes = document.scenes().count();
        if scenes > 1 {
            tracing::warn!(scenes, "only the default scene is transcoded");
        }
        for mesh in document.meshes() {
            if mesh.primitives().any(|p| p.morph_targets().next().is_some()) {
                tracing::warn!(mesh = mesh.index(), "morph targets are not transcoded and will be dropped");
            }
        }
        Ok(())
    }

    fn decode_scene_nodes(&self, document: &gltf::Document, scene: &mut Scene) {
        for gltf_node in document.nodes() {
            let mut node = SceneNode::new();
            node.set_name(gltf_node.name().map(str::to_string));
            node.set_transform(match gltf_node.transform() {
                gltf::scene::Transform::Matrix { matrix } => NodeTransform::Matrix(matrix),
                gltf::scene::Transform::Decomposed { translation, rotation, scale } => {
                    NodeTransform::Decomposed { translation, rotation, scale }
                }
            });
            node.set_mesh_group_index(gltf_node.mesh().map(|mesh| mesh.index()));
            for child in gltf_node.children() {
                node.add_child_index(child.index());
            }
            scene.add_node(node);
        }

        match document.default_scene().or_else(|| document.scenes().next()) {
            Some(gltf_scene) => {
                for root in gltf_scene.nodes() {
                    scene.add_root_node_index(root.index());
                }
            }
            None => {
                // Without a scene every node that is nobody's child is a root.
                let children: HashSet<usize> = document
                    .nodes()
                    .flat_map(|node| node.children().map(|child| child.index()).collect::<Vec<_>>())
                    .collect();
                for node in document.nodes().filter(|node| !children.contains(&node.index())) {
                    scene.add_root_node_index(node.index());
                }
            }
        }
    }

    fn decode_image(&mut self, image: &gltf::Image, buffers: &[gltf::buffer::Data]) -> Result<Image, Err> {
        let (encoded_data, mime_type) = match image.source() {
            gltf::image::Source::View { view, mime_type } => {
                let buffer = buffers.get(view.buffer().index()).ok_or_else(|| {
                    Err::InvalidInput(format!("Image {} refers to a missing buffer.", image.index()))
                })?;
                let start = view.offset();
                let data = buffer.0.get(start..start + view.length()).ok_or_else(|| {
                    Err::InvalidInput(format!("Image {} lies outside of its buffer.", image.index()))
                })?;
                (data.to_vec(), Some(mime_type.to_string()))
            }
            gltf::image::Source::Uri { uri, mime_type } => {
                let (data, data_mime_type) = self.read_uri(uri)?;
                (data, mime_type.map(str::to_string).or(data_mime_type))
            }
        };
        let mime_type = mime_type
            .or_else(|| texture::guess_mime_type(&encoded_data).map(str::to_string))
            .ok_or_else(|| {
                Err::InvalidInput(format!("Cannot determine the mime type of image {}.", image.index()))
            })?;

        let mut decoded = Image::new(mime_type, encoded_data);
        decoded.set_name(image.name().map(str::to_string));
        Ok(decoded)
    }

    /// Reads the content referenced by `uri`, which is either a base64 data
    /// URI or a path relative to the asset. Returns the mime type when the
    /// URI carries one.
    fn read_uri(&mut self, uri: &str) -> Result<(Vec<u8>, Option<String>), Err> {
        if let Some(rest) = uri.strip_prefix("data:") {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| Err::InvalidInput("Malformed data URI.".to_string()))?;
            let mime_type = header
                .strip_suffix(";base64")
                .ok_or_else(|| Err::Unsupported("Only base64 data URIs are supported.".to_string()))?;
            let data = general_purpose::STANDARD
                .decode(payload)
                .map_err(|e| Err::InvalidInput(format!("Invalid base64 data URI: {}", e)))?;
            let mime_type = (!mime_type.is_empty()).then(|| mime_type.to_string());
            return Ok((data, mime_type));
        }

        let base_dir = self.base_dir.as_ref().ok_or_else(|| {
            Err::InvalidInput(format!(
                "External reference {} cannot be resolved when decoding from a buffer.",
                uri
            ))
        })?;
        let path = base_dir.join(uri);
        let data = std::fs::read(&path)
            .map_err(|e| Err::IoError(format!("Failed to read {}: {}", path.display(), e)))?;
        self.input_files.push(path);
        Ok((data, None))
    }

    fn track_external_uri(&mut self, uri: &str) {
        if uri.starts_with("data:") {
            return;
        }
        if let Some(base_dir) = &self.base_dir {
            self.input_files.push(base_dir.join(uri));
        }
    }
}

fn decode_primitive(primitive: &gltf::Primitive, buffers: &[gltf::buffer::Data]) -> Result<Mesh, Err> {
    if primitive.mode() != Mode::Triangles {
        return Err(Err::Unsupported(format!(
            "Primitive mode {:?} is not supported, only triangles are.",
            primitive.mode()
        )));
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or_else(|| Err::InvalidInput("Primitive has no POSITION attribute.".to_string()))?
        .collect();
    let mut attributes = vec![Attribute::from_vectors(AttributeType::Position, 0, &positions)?];
    if let Some(normals) = reader.read_normals() {
        let normals: Vec<[f32; 3]> = normals.collect();
        attributes.push(Attribute::from_vectors(AttributeType::Normal, 0, &normals)?);
    }
    if let Some(tangents) = reader.read_tangents() {
        let tangents: Vec<[f32; 4]> = tangents.collect();
        attributes.push(Attribute::from_vectors(AttributeType::Tangent, 0, &tangents)?);
    }
    let mut set = 0;
    while let Some(tex_coords) = reader.read_tex_coords(set) {
        let tex_coords: Vec<[f32; 2]> = tex_coords.into_f32().collect();
        attributes.push(Attribute::from_vectors(AttributeType::TextureCoordinate, set, &tex_coords)?);
        set += 1;
    }
    let mut set = 0;
    while let Some(colors) = reader.read_colors(set) {
        let colors: Vec<[f32; 4]> = colors.into_rgba_f32().collect();
        attributes.push(Attribute::from_vectors(AttributeType::Color, set, &colors)?);
        set += 1;
    }

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    if indices.len() % 3 != 0 {
        return Err(Err::InvalidInput(format!(
            "Triangle primitive has {} indices, which is not a multiple of 3.",
            indices.len()
        )));
    }
    let faces = indices.chunks_exact(3).map(|f| [f[0], f[1], f[2]]).collect();

    let mut mesh = Mesh::from_parts(faces, attributes)?;
    let extras = primitive
        .extras()
        .as_ref()
        .and_then(|raw| serde_json::from_str::<PrimitiveExtras>(raw.get()).ok())
        .unwrap_or_default();
    mesh.set_compression_enabled(extras.compression_options.is_some());
    mesh.set_compression_options(extras.compression_options);
    Ok(mesh)
}

fn decode_material(gltf_material: &gltf::Material) -> Material {
    let pbr = gltf_material.pbr_metallic_roughness();
    let mut material = Material::new();
    material.name = gltf_material.name().map(str::to_string);
    material.color_factor = pbr.base_color_factor();
    material.metallic_factor = pbr.metallic_factor();
    material.roughness_factor = pbr.roughness_factor();
    material.color_texture = pbr.base_color_texture().map(|info| texture_ref(&info));
    material.metallic_roughness_texture = pbr.metallic_roughness_texture().map(|info| texture_ref(&info));
    if let Some(normal) = gltf_material.normal_texture() {
        material.normal_texture = Some(TextureRef {
            texture_index: normal.texture().index(),
            tex_coord: normal.tex_coord(),
        });
        material.normal_texture_scale = normal.scale();
    }
    if let Some(occlusion) = gltf_material.occlusion_texture() {
        material.occlusion_texture = Some(TextureRef {
            texture_index: occlusion.texture().index(),
            tex_coord: occlusion.tex_coord(),
        });
        material.occlusion_strength = occlusion.strength();
    }
    material.emissive_texture = gltf_material.emissive_texture().map(|info| texture_ref(&info));
    material.emissive_factor = gltf_material.emissive_factor();
    material.double_sided = gltf_material.double_sided();
    material.transparency_mode = match gltf_material.alpha_mode() {
        gltf::material::AlphaMode::Opaque => TransparencyMode::Opaque,
        gltf::material::AlphaMode::Mask => TransparencyMode::Mask,
        gltf::material::AlphaMode::Blend => TransparencyMode::Blend,
    };
    material.alpha_cutoff = gltf_material.alpha_cutoff();
    material
}

fn texture_ref(info: &gltf::texture::Info) -> TextureRef {
    TextureRef {
        texture_index: info.texture().index(),
        tex_coord: info.tex_coord(),
    }
}

fn decode_sampler(sampler: &gltf::texture::Sampler) -> Sampler {
    Sampler {
        mag_filter: sampler.mag_filter().map(|filter| filter.as_gl_enum()),
        min_filter: sampler.min_filter().map(|filter| filter.as_gl_enum()),
        wrap_s: sampler.wrap_s().as_gl_enum(),
        wrap_t: sampler.wrap_t().as_gl_enum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A single triangle: three VEC3 float positions followed by three u16 indices.
    fn triangle_gltf(extra_json: &str) -> String {
        let mut bin = Vec::new();
        for v in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in v {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        for i in [0u16, 1, 2] {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        bin.extend_from_slice(&[0, 0]);
        let uri = format!("data:application/octet-stream;base64,{}", general_purpose::STANDARD.encode(&bin));
        format!(
            r#"{{
                "asset": {{ "version": "2.0", "copyright": "test" }},
                "scene": 0,
                "scenes": [ {{ "nodes": [0] }} ],
                "nodes": [ {{ "name": "root", "mesh": 0, "translation": [1.0, 2.0, 3.0] }} ],
                "meshes": [ {{ "name": "tri", "primitives": [ {{ "attributes": {{ "POSITION": 0 }}, "indices": 1 {} }} ] }} ],
                "accessors": [
                    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] }},
                    {{ "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }}
                ],
                "bufferViews": [
                    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
                    {{ "buffer": 0, "byteOffset": 36, "byteLength": 6 }}
                ],
                "buffers": [ {{ "byteLength": {}, "uri": "{}" }} ]
            }}"#,
            extra_json,
            bin.len(),
            uri
        )
    }

    #[test]
    fn decode_triangle_from_buffer() {
        let json = triangle_gltf("");
        let scene = GltfDecoder::new().decode_buffer_to_scene(json.as_bytes()).unwrap();
        assert_eq!(scene.num_meshes(), 1);
        assert_eq!(scene.get_copyright(), Some("test"));
        let mesh = scene.get_mesh(0).unwrap();
        assert_eq!(mesh.get_faces(), &[[0, 1, 2]]);
        assert_eq!(mesh.num_points(), 3);
        assert_eq!(mesh.get_name(), Some("tri"));
        assert!(!mesh.is_compression_enabled());
        assert_eq!(scene.root_node_indices(), &[0]);
        assert_eq!(
            scene.get_node(0).unwrap().get_transform(),
            &NodeTransform::Decomposed {
                translation: [1.0, 2.0, 3.0],
                rotation: [0.0, 0.0, 0.0, 1.0],
                scale: [1.0, 1.0, 1.0],
            }
        );
    }

    #[test]
    fn compression_extras_are_read_back() {
        let json = triangle_gltf(r#", "extras": { "compressionOptions": { "compression_level": 2 } }"#);
        let scene = GltfDecoder::new().decode_buffer_to_scene(json.as_bytes()).unwrap();
        let mesh = scene.get_mesh(0).unwrap();
        assert!(mesh.is_compression_enabled());
        assert_eq!(mesh.get_compression_options().unwrap().compression_level, 2);
    }

    #[test]
    fn unsupported_mode_is_rejected() {
        let json = triangle_gltf(r#", "mode": 0"#);
        let err = GltfDecoder::new().decode_buffer_to_scene(json.as_bytes()).unwrap_err();
        assert!(matches!(err, Err::Unsupported(_)));
    }

    #[test]
    fn garbage_is_a_load_error() {
        let err = GltfDecoder::new().decode_buffer_to_scene(b"definitely not gltf").unwrap_err();
        assert!(matches!(err, Err::LoadError(_)));
        let err = GltfDecoder::new().decode_buffer_to_scene(&[]).unwrap_err();
        assert!(matches!(err, Err::LoadError(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = GltfDecoder::new()
            .decode_file_to_scene(Path::new("/nonexistent/draco_transcoder/scene.glb"))
            .unwrap_err();
        assert!(matches!(err, Err::IoError(_)));
    }
}
