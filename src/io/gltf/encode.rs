use std::collections::HashMap;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use base64::{engine::general_purpose, Engine as _};
use indexmap::IndexMap;
use serde::Serialize;

use crate::core::attribute::AttributeType;
use crate::core::material::{Material, TransparencyMode};
use crate::core::mesh::Mesh;
use crate::core::scene::{NodeTransform, Scene};
use crate::core::texture::{Image, Sampler, TextureRef};
use crate::io::gltf::{
    PrimitiveExtras, COMPONENT_TYPE_FLOAT, COMPONENT_TYPE_UNSIGNED_INT, TARGET_ARRAY_BUFFER,
    TARGET_ELEMENT_ARRAY_BUFFER,
};
use crate::io::scene_io::SceneEncoder;

const GENERATOR: &str = concat!("draco-transcoder ", env!("CARGO_PKG_VERSION"));

#[remain::sorted]
#[derive(Debug, thiserror::Error)]
pub enum Err {
    #[error("Encoding Error: {0}")]
    EncodingError(String),
    #[error("Invalid Input: {0}")]
    InvalidInput(String),
    #[error("IO Error: {0}")]
    IoError(String),
    #[error("JSON Error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Mesh Error: {0}")]
    MeshError(#[from] crate::core::mesh::Err),
    #[error("Scene Error: {0}")]
    SceneError(#[from] crate::core::scene::Err),
}

/// Types of output modes for the glTF data encoder. `Compact` writes minified
/// JSON into glTF-Binary output. `Verbose` writes readable JSON everywhere and
/// spells out default node transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputType {
    #[default]
    Compact,
    Verbose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum JsonOutputMode {
    Compact,
    #[default]
    Readable,
}

// Where the images of the asset end up.
#[derive(Debug)]
enum ImageStorage {
    Buffer,
    DataUri,
    Files { resource_dir: PathBuf, output_dir: PathBuf },
}

// Where the binary buffer of the asset ends up.
#[derive(Debug)]
enum BufferStorage {
    Glb,
    DataUri,
    File(String),
}

/// Encodes a [`Scene`] into the glTF 2.0 file format.
///
/// Geometry is written losslessly as float attributes and 32 bit indices. The
/// compression settings stamped on each mesh are recorded in the `extras` of
/// its primitive so that a later decode restores them.
#[derive(Debug, Clone, Default)]
pub struct GltfEncoder {
    output_type: OutputType,
    copyright: Option<String>,
}

impl SceneEncoder for GltfEncoder {
    type Error = Err;

    /// Writes `.glb` as glTF-Binary and `.gltf` as JSON with the buffer and
    /// images embedded as data URIs.
    fn encode_scene_file(&mut self, scene: &Scene, file_name: &Path) -> Result<(), Err> {
        match check_output_extension(file_name)? {
            OutputExtension::Glb => write_file(file_name, &self.encode_glb(scene)?),
            OutputExtension::Gltf => {
                let asset = self.encode_asset(scene, &ImageStorage::DataUri, BufferStorage::DataUri)?;
                write_file(file_name, &asset.output_json()?)
            }
        }
    }

    /// Images are written next to `file_name`. `bin_file_name` is ignored
    /// for glTF-Binary output.
    fn encode_scene_file_with_bin(
        &mut self,
        scene: &Scene,
        file_name: &Path,
        bin_file_name: &Path,
    ) -> Result<(), Err> {
        check_output_extension(file_name)?;
        let resource_dir = parent_dir(file_name);
        self.encode_scene_file_with_resources(scene, file_name, bin_file_name, &resource_dir)
    }

    /// `bin_file_name` and `resource_dir` are ignored for glTF-Binary output.
    fn encode_scene_file_with_resources(
        &mut self,
        scene: &Scene,
        file_name: &Path,
        bin_file_name: &Path,
        resource_dir: &Path,
    ) -> Result<(), Err> {
        if check_output_extension(file_name)? == OutputExtension::Glb {
            return self.encode_scene_file(scene, file_name);
        }

        let output_dir = parent_dir(file_name);
        let image_storage = ImageStorage::Files {
            resource_dir: resource_dir.to_path_buf(),
            output_dir: output_dir.clone(),
        };
        let buffer_uri = relative_uri(bin_file_name, &output_dir);
        let asset = self.encode_asset(scene, &image_storage, BufferStorage::File(buffer_uri))?;

        let json_data = asset.output_json()?;
        // The primary file goes last so a failed resource write leaves no
        // asset pointing at missing files.
        if !asset.buffer.is_empty() {
            create_dir(&parent_dir(bin_file_name))?;
            write_file(bin_file_name, &asset.buffer)?;
        }
        if !asset.image_files.is_empty() {
            create_dir(resource_dir)?;
        }
        for (path, data) in &asset.image_files {
            write_file(path, data)?;
        }
        write_file(file_name, &json_data)
    }

    /// Encodes the scene as glTF-Binary.
    fn encode_scene_to_buffer(&mut self, scene: &Scene) -> Result<Vec<u8>, Err> {
        self.encode_glb(scene)
    }
}

impl GltfEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_output_type(&mut self, output_type: OutputType) {
        self.output_type = output_type;
    }

    pub fn output_type(&self) -> OutputType {
        self.output_type
    }

    /// Overrides the copyright of the scene in the written asset.
    pub fn set_copyright(&mut self, copyright: Option<String>) {
        self.copyright = copyright;
    }

    pub fn copyright(&self) -> Option<&str> {
        self.copyright.as_deref()
    }

    fn encode_glb(&self, scene: &Scene) -> Result<Vec<u8>, Err> {
        let asset = self.encode_asset(scene, &ImageStorage::Buffer, BufferStorage::Glb)?;
        let json_data = asset.output_json()?;
        let mut out = Vec::with_capacity(json_data.len() + asset.buffer.len() + 28);
        write_glb_format(&mut out, &json_data, &asset.buffer)?;
        Ok(out)
    }

    fn encode_asset(
        &self,
        scene: &Scene,
        image_storage: &ImageStorage,
        buffer_storage: BufferStorage,
    ) -> Result<GltfAsset, Err> {
        let mut asset = GltfAsset::new();
        asset.output_type = self.output_type;
        asset.json_output_mode = self.json_output_mode(image_storage);
        asset.asset.copyright = self.copyright.clone().or_else(|| scene.get_copyright().map(str::to_string));
        asset.add_scene(scene, image_storage)?;
        asset.finish_buffer(buffer_storage);
        tracing::debug!(
            accessors = asset.accessors.len(),
            buffer_views = asset.buffer_views.len(),
            buffer_bytes = asset.buffer.len(),
            "encoded glTF asset"
        );
        Ok(asset)
    }

    fn json_output_mode(&self, image_storage: &ImageStorage) -> JsonOutputMode {
        if self.output_type == OutputType::Compact && matches!(image_storage, ImageStorage::Buffer) {
            JsonOutputMode::Compact
        } else {
            JsonOutputMode::Readable
        }
    }
}

/// Writes the glTF-Binary container: a 12 byte header, the JSON chunk padded
/// with spaces and the optional BIN chunk padded with zeros.
fn write_glb_format<W: Write>(writer: &mut W, json_data: &[u8], binary_data: &[u8]) -> Result<(), Err> {
    let json_length = json_data.len();
    let json_padded_length = (json_length + 3) & !3;
    let binary_length = binary_data.len();
    let binary_padded_length = (binary_length + 3) & !3;

    let total_length = 12
        + 8
        + json_padded_length
        + if binary_padded_length > 0 { 8 + binary_padded_length } else { 0 };
    let total_length = u32::try_from(total_length)
        .map_err(|_| Err::EncodingError("Asset exceeds the 4 GiB limit of glTF-Binary.".to_string()))?;

    let io_err = |e: std::io::Error| Err::IoError(format!("Failed to write GLB data: {}", e));
    writer.write_all(b"glTF").map_err(io_err)?;
    writer.write_all(&2u32.to_le_bytes()).map_err(io_err)?;
    writer.write_all(&total_length.to_le_bytes()).map_err(io_err)?;

    writer.write_all(&(json_padded_length as u32).to_le_bytes()).map_err(io_err)?;
    writer.write_all(b"JSON").map_err(io_err)?;
    writer.write_all(json_data).map_err(io_err)?;
    writer.write_all(&b"   "[..json_padded_length - json_length]).map_err(io_err)?;

    if binary_padded_length > 0 {
        writer.write_all(&(binary_padded_length as u32).to_le_bytes()).map_err(io_err)?;
        writer.write_all(b"BIN\0").map_err(io_err)?;
        writer.write_all(binary_data).map_err(io_err)?;
        writer.write_all(&[0u8; 3][..binary_padded_length - binary_length]).map_err(io_err)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputExtension {
    Gltf,
    Glb,
}

fn check_output_extension(file_name: &Path) -> Result<OutputExtension, Err> {
    let extension = file_name
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "gltf" => Ok(OutputExtension::Gltf),
        "glb" => Ok(OutputExtension::Glb),
        _ => Err(Err::InvalidInput("gltf_encoder only supports .gltf or .glb output.".to_string())),
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

fn create_dir(dir: &Path) -> Result<(), Err> {
    std::fs::create_dir_all(dir)
        .map_err(|e| Err::IoError(format!("Failed to create directory {}: {}", dir.display(), e)))
}

fn write_file(path: &Path, data: &[u8]) -> Result<(), Err> {
    std::fs::write(path, data).map_err(|e| Err::IoError(format!("Failed to write {}: {}", path.display(), e)))
}

/// Returns `target` as a URI relative to the directory `base`, using `/` as
/// the separator. Falls back to the plain path when the two do not share a
/// root.
fn relative_uri(target: &Path, base: &Path) -> String {
    let normalize = |path: &Path| -> Vec<String> {
        path.components()
            .filter(|component| *component != Component::CurDir)
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect()
    };
    if target.has_root() != base.has_root() {
        return if target.has_root() {
            target.to_string_lossy().replace('\\', "/")
        } else {
            normalize(target).join("/")
        };
    }
    let target_parts = normalize(target);
    let base_parts = normalize(base);
    let common = target_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();
    if target.has_root() && common == 0 {
        return target.to_string_lossy().replace('\\', "/");
    }
    let mut parts = vec!["..".to_string(); base_parts.len() - common];
    parts.extend_from_slice(&target_parts[common..]);
    parts.join("/")
}

#[derive(Debug, Serialize)]
struct AssetJson {
    version: &'static str,
    generator: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    copyright: Option<String>,
}

impl Default for AssetJson {
    fn default() -> Self {
        Self {
            version: "2.0",
            generator: GENERATOR,
            copyright: None,
        }
    }
}

#[derive(Debug, Default, Serialize)]
struct SceneJson {
    nodes: Vec<usize>,
}

#[derive(Debug, Default, Serialize)]
struct NodeJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mesh: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    matrix: Option<[f32; 16]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    translation: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rotation: Option<[f32; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scale: Option<[f32; 3]>,
}

#[derive(Debug, Serialize)]
struct MeshJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    primitives: Vec<PrimitiveJson>,
}

#[derive(Debug, Serialize)]
struct PrimitiveJson {
    attributes: IndexMap<String, usize>,
    indices: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    material: Option<usize>,
    #[serde(skip_serializing_if = "PrimitiveExtras::is_empty")]
    extras: PrimitiveExtras,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct MaterialJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    pbr_metallic_roughness: PbrMetallicRoughnessJson,
    #[serde(skip_serializing_if = "Option::is_none")]
    normal_texture: Option<NormalTextureJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    occlusion_texture: Option<OcclusionTextureJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    emissive_texture: Option<TextureInfoJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    emissive_factor: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alpha_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alpha_cutoff: Option<f32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    double_sided: bool,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct PbrMetallicRoughnessJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    base_color_factor: Option<[f32; 4]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    base_color_texture: Option<TextureInfoJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metallic_factor: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    roughness_factor: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metallic_roughness_texture: Option<TextureInfoJson>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextureInfoJson {
    index: usize,
    tex_coord: u32,
}

impl From<TextureRef> for TextureInfoJson {
    fn from(texture: TextureRef) -> Self {
        Self {
            index: texture.texture_index,
            tex_coord: texture.tex_coord,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NormalTextureJson {
    index: usize,
    tex_coord: u32,
    scale: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OcclusionTextureJson {
    index: usize,
    tex_coord: u32,
    strength: f32,
}

#[derive(Debug, Serialize)]
struct TextureJson {
    source: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    sampler: Option<usize>,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct SamplerJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    mag_filter: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_filter: Option<u32>,
    wrap_s: u32,
    wrap_t: u32,
}

impl From<&Sampler> for SamplerJson {
    fn from(sampler: &Sampler) -> Self {
        Self {
            mag_filter: sampler.mag_filter,
            min_filter: sampler.min_filter,
            wrap_s: sampler.wrap_s,
            wrap_t: sampler.wrap_t,
        }
    }
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    buffer_view: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AccessorJson {
    buffer_view: usize,
    component_type: u32,
    count: usize,
    #[serde(rename = "type")]
    accessor_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<Vec<f32>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BufferViewJson {
    buffer: usize,
    byte_offset: usize,
    byte_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BufferJson {
    byte_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<String>,
}

// Accessors written for one base mesh. Mesh groups instancing the same mesh
// share them.
#[derive(Debug, Clone)]
struct PrimitiveAccessors {
    attributes: IndexMap<String, usize>,
    indices: usize,
}

/// In-progress glTF document. Serializing it yields the glTF JSON.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GltfAsset {
    asset: AssetJson,
    #[serde(skip_serializing_if = "Option::is_none")]
    scene: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    scenes: Vec<SceneJson>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    nodes: Vec<NodeJson>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    meshes: Vec<MeshJson>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    materials: Vec<MaterialJson>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    textures: Vec<TextureJson>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    samplers: Vec<SamplerJson>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<ImageJson>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    accessors: Vec<AccessorJson>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    buffer_views: Vec<BufferViewJson>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    buffers: Vec<BufferJson>,

    #[serde(skip)]
    output_type: OutputType,
    #[serde(skip)]
    json_output_mode: JsonOutputMode,
    #[serde(skip)]
    buffer: Vec<u8>,
    #[serde(skip)]
    image_files: Vec<(PathBuf, Vec<u8>)>,
    #[serde(skip)]
    mesh_accessors: HashMap<usize, PrimitiveAccessors>,
}

impl GltfAsset {
    fn new() -> Self {
        Self::default()
    }

    fn add_scene(&mut self, scene: &Scene, image_storage: &ImageStorage) -> Result<(), Err> {
        scene.validate()?;
        self.add_mesh_groups(scene)?;
        self.add_nodes(scene);
        for material in scene.materials() {
            self.materials.push(material_json(material));
        }
        for texture in scene.textures() {
            let sampler = self.add_sampler(texture.get_sampler());
            self.textures.push(TextureJson {
                source: texture.get_image_index(),
                sampler,
            });
        }
        self.add_images(scene.images(), image_storage);
        Ok(())
    }

    fn add_mesh_groups(&mut self, scene: &Scene) -> Result<(), Err> {
        for (group_index, group) in scene.mesh_groups().iter().enumerate() {
            if group.num_mesh_instances() == 0 {
                return Err(Err::InvalidInput(format!("Mesh group {} has no mesh instances.", group_index)));
            }
            let mut primitives = Vec::with_capacity(group.num_mesh_instances());
            for instance in group.mesh_instances() {
                let mesh = scene
                    .get_mesh(instance.mesh_index)
                    .ok_or(crate::core::scene::Err::InvalidMeshIndex(instance.mesh_index, scene.num_meshes()))?;
                let accessors = self.add_mesh_accessors(instance.mesh_index, mesh)?;
                let compression_options = if mesh.is_compression_enabled() {
                    mesh.get_compression_options().cloned()
                } else {
                    None
                };
                primitives.push(PrimitiveJson {
                    attributes: accessors.attributes,
                    indices: accessors.indices,
                    material: instance.material_index,
                    extras: PrimitiveExtras { compression_options },
                });
            }
            self.meshes.push(MeshJson {
                name: group.get_name().map(str::to_string),
                primitives,
            });
        }
        Ok(())
    }

    fn add_mesh_accessors(&mut self, mesh_index: usize, mesh: &Mesh) -> Result<PrimitiveAccessors, Err> {
        if let Some(accessors) = self.mesh_accessors.get(&mesh_index) {
            return Ok(accessors.clone());
        }
        mesh.validate()?;
        if mesh.num_faces() == 0 {
            return Err(Err::InvalidInput(format!("Mesh {} has no faces.", mesh_index)));
        }

        let mut attributes = IndexMap::new();
        for attribute in mesh.get_attributes() {
            let (min, max) = if attribute.get_attribute_type() == AttributeType::Position {
                attribute.bounds().unzip()
            } else {
                (None, None)
            };
            let data: Vec<u8> = attribute.get_values().iter().flat_map(|v| v.to_le_bytes()).collect();
            let buffer_view = self.add_buffer_view(&data, Some(TARGET_ARRAY_BUFFER));
            let accessor_type = match attribute.get_num_components() {
                2 => "VEC2",
                3 => "VEC3",
                4 => "VEC4",
                n => {
                    return Err(Err::EncodingError(format!(
                        "Attributes with {} components cannot be written.",
                        n
                    )))
                }
            };
            attributes.insert(
                attribute.gltf_semantic(),
                self.add_accessor(AccessorJson {
                    buffer_view,
                    component_type: COMPONENT_TYPE_FLOAT,
                    count: attribute.len(),
                    accessor_type,
                    min,
                    max,
                }),
            );
        }

        let data: Vec<u8> = mesh.get_faces().iter().flatten().flat_map(|i| i.to_le_bytes()).collect();
        let buffer_view = self.add_buffer_view(&data, Some(TARGET_ELEMENT_ARRAY_BUFFER));
        let indices = self.add_accessor(AccessorJson {
            buffer_view,
            component_type: COMPONENT_TYPE_UNSIGNED_INT,
            count: mesh.num_faces() * 3,
            accessor_type: "SCALAR",
            min: None,
            max: None,
        });

        let accessors = PrimitiveAccessors { attributes, indices };
        self.mesh_accessors.insert(mesh_index, accessors.clone());
        Ok(accessors)
    }

    fn add_nodes(&mut self, scene: &Scene) {
        let verbose = self.output_type == OutputType::Verbose;
        for node in scene.nodes() {
            let mut json = NodeJson {
                name: node.get_name().map(str::to_string),
                children: node.children().to_vec(),
                mesh: node.get_mesh_group_index(),
                ..NodeJson::default()
            };
            match *node.get_transform() {
                NodeTransform::Matrix(columns) => {
                    let mut matrix = [0.0f32; 16];
                    for (c, column) in columns.iter().enumerate() {
                        matrix[c * 4..c * 4 + 4].copy_from_slice(column);
                    }
                    json.matrix = Some(matrix);
                }
                NodeTransform::Decomposed { translation, rotation, scale } => {
                    json.translation = (verbose || translation != [0.0; 3]).then_some(translation);
                    json.rotation = (verbose || rotation != [0.0, 0.0, 0.0, 1.0]).then_some(rotation);
                    json.scale = (verbose || scale != [1.0; 3]).then_some(scale);
                }
            }
            self.nodes.push(json);
        }
        if !scene.nodes().is_empty() {
            self.scenes.push(SceneJson {
                nodes: scene.root_node_indices().to_vec(),
            });
            self.scene = Some(0);
        }
    }

    fn add_sampler(&mut self, sampler: &Sampler) -> Option<usize> {
        if sampler.is_default() {
            return None;
        }
        let json = SamplerJson::from(sampler);
        match self.samplers.iter().position(|existing| *existing == json) {
            Some(index) => Some(index),
            None => {
                self.samplers.push(json);
                Some(self.samplers.len() - 1)
            }
        }
    }

    fn add_images(&mut self, images: &[Image], image_storage: &ImageStorage) {
        let mut used_names = Vec::new();
        for (index, image) in images.iter().enumerate() {
            let data = image.get_encoded_data();
            let mut json = ImageJson {
                name: image.get_name().map(str::to_string),
                mime_type: Some(image.get_mime_type().to_string()),
                ..ImageJson::default()
            };
            match image_storage {
                ImageStorage::Buffer => json.buffer_view = Some(self.add_buffer_view(data, None)),
                ImageStorage::DataUri => {
                    json.uri = Some(format!(
                        "data:{};base64,{}",
                        image.get_mime_type(),
                        general_purpose::STANDARD.encode(data)
                    ));
                }
                ImageStorage::Files { resource_dir, output_dir } => {
                    let file_name = image_file_name(image, index, &mut used_names);
                    let path = resource_dir.join(file_name);
                    json.uri = Some(relative_uri(&path, output_dir));
                    self.image_files.push((path, data.to_vec()));
                }
            }
            self.images.push(json);
        }
    }

    fn add_accessor(&mut self, accessor: AccessorJson) -> usize {
        self.accessors.push(accessor);
        self.accessors.len() - 1
    }

    fn add_buffer_view(&mut self, data: &[u8], target: Option<u32>) -> usize {
        self.pad_buffer();
        self.buffer_views.push(BufferViewJson {
            buffer: 0,
            byte_offset: self.buffer.len(),
            byte_length: data.len(),
            target,
        });
        self.buffer.extend_from_slice(data);
        self.buffer_views.len() - 1
    }

    // Pad the buffer to a 4 byte boundary.
    fn pad_buffer(&mut self) {
        let padded = (self.buffer.len() + 3) & !3;
        self.buffer.resize(padded, 0);
    }

    fn finish_buffer(&mut self, storage: BufferStorage) {
        if self.buffer.is_empty() {
            return;
        }
        self.pad_buffer();
        let uri = match storage {
            BufferStorage::Glb => None,
            BufferStorage::DataUri => Some(format!(
                "data:application/octet-stream;base64,{}",
                general_purpose::STANDARD.encode(&self.buffer)
            )),
            BufferStorage::File(uri) => Some(uri),
        };
        self.buffers = vec![BufferJson {
            byte_length: self.buffer.len(),
            uri,
        }];
    }

    fn output_json(&self) -> Result<Vec<u8>, Err> {
        Ok(match self.json_output_mode {
            JsonOutputMode::Compact => serde_json::to_vec(self)?,
            JsonOutputMode::Readable => serde_json::to_vec_pretty(self)?,
        })
    }
}

fn material_json(material: &Material) -> MaterialJson {
    let defaults = Material::new();
    MaterialJson {
        name: material.name.clone(),
        pbr_metallic_roughness: PbrMetallicRoughnessJson {
            base_color_factor: (material.color_factor != defaults.color_factor).then_some(material.color_factor),
            base_color_texture: material.color_texture.map(TextureInfoJson::from),
            metallic_factor: (material.metallic_factor != defaults.metallic_factor).then_some(material.metallic_factor),
            roughness_factor: (material.roughness_factor != defaults.roughness_factor)
                .then_some(material.roughness_factor),
            metallic_roughness_texture: material.metallic_roughness_texture.map(TextureInfoJson::from),
        },
        normal_texture: material.normal_texture.map(|texture| NormalTextureJson {
            index: texture.texture_index,
            tex_coord: texture.tex_coord,
            scale: material.normal_texture_scale,
        }),
        occlusion_texture: material.occlusion_texture.map(|texture| OcclusionTextureJson {
            index: texture.texture_index,
            tex_coord: texture.tex_coord,
            strength: material.occlusion_strength,
        }),
        emissive_texture: material.emissive_texture.map(TextureInfoJson::from),
        emissive_factor: (material.emissive_factor != defaults.emissive_factor).then_some(material.emissive_factor),
        alpha_mode: match material.transparency_mode {
            TransparencyMode::Opaque => None,
            TransparencyMode::Mask => Some("MASK"),
            TransparencyMode::Blend => Some("BLEND"),
        },
        alpha_cutoff: material.alpha_cutoff,
        double_sided: material.double_sided,
    }
}

/// File name of an image written as a separate resource. Names come from the
/// image name with unsafe characters replaced, or from the image index.
fn image_file_name(image: &Image, index: usize, used_names: &mut Vec<String>) -> String {
    let stem = match image.get_name() {
        Some(name) if !name.is_empty() => name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect(),
        _ => format!("image{}", index),
    };
    let mut file_name = format!("{}.{}", stem, image.file_extension());
    if used_names.contains(&file_name) {
        file_name = format!("{}_{}.{}", stem, index, image.file_extension());
    }
    used_names.push(file_name.clone());
    file_name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scene::utils::testing::triangle_scene;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("draco_transcoder_encode_{}_{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn glb_container_layout() {
        let glb = GltfEncoder::new().encode_scene_to_buffer(&triangle_scene()).unwrap();
        assert_eq!(&glb[0..4], b"glTF");
        assert_eq!(u32::from_le_bytes(glb[4..8].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(glb[8..12].try_into().unwrap()) as usize, glb.len());
        assert_eq!(&glb[16..20], b"JSON");
        let json_length = u32::from_le_bytes(glb[12..16].try_into().unwrap()) as usize;
        assert_eq!(json_length % 4, 0);
        assert_eq!(&glb[20 + json_length + 4..20 + json_length + 8], b"BIN\0");
        assert_eq!(glb.len() % 4, 0);
    }

    #[test]
    fn glb_output_is_deterministic() {
        let scene = triangle_scene();
        let first = GltfEncoder::new().encode_scene_to_buffer(&scene).unwrap();
        let second = GltfEncoder::new().encode_scene_to_buffer(&scene).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn compact_json_uses_camel_case() {
        let mut asset = GltfAsset::new();
        asset.json_output_mode = JsonOutputMode::Compact;
        asset.add_scene(&triangle_scene(), &ImageStorage::Buffer).unwrap();
        asset.finish_buffer(BufferStorage::Glb);
        let json: serde_json::Value = serde_json::from_slice(&asset.output_json().unwrap()).unwrap();
        assert_eq!(json["asset"]["version"], "2.0");
        assert_eq!(json["accessors"][0]["componentType"], COMPONENT_TYPE_FLOAT);
        assert_eq!(json["accessors"][0]["type"], "VEC3");
        assert!(json["accessors"][0]["min"].is_array());
        assert_eq!(json["bufferViews"][0]["byteOffset"], 0);
        assert!(json["buffers"][0].get("uri").is_none());
        assert_eq!(json["scene"], 0);
    }

    #[test]
    fn verbose_output_and_copyright_override() {
        let mut encoder = GltfEncoder::new();
        encoder.set_output_type(OutputType::Verbose);
        encoder.set_copyright(Some("Someone Else".to_string()));
        let glb = encoder.encode_scene_to_buffer(&triangle_scene()).unwrap();
        let json_length = u32::from_le_bytes(glb[12..16].try_into().unwrap()) as usize;
        let json = std::str::from_utf8(&glb[20..20 + json_length]).unwrap();
        assert!(json.contains('\n'));
        let json: serde_json::Value = serde_json::from_str(json.trim_end()).unwrap();
        assert_eq!(json["asset"]["copyright"], "Someone Else");
        assert_eq!(json["nodes"][0]["scale"], serde_json::json!([1.0, 1.0, 1.0]));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = GltfEncoder::new()
            .encode_scene_file(&triangle_scene(), Path::new("scene.obj"))
            .unwrap_err();
        assert!(matches!(err, Err::InvalidInput(_)));
    }

    #[test]
    fn empty_mesh_group_is_rejected() {
        let mut scene = triangle_scene();
        scene.add_mesh_group(crate::core::scene::MeshGroup::new());
        let err = GltfEncoder::new().encode_scene_to_buffer(&scene).unwrap_err();
        assert!(matches!(err, Err::InvalidInput(_)));
    }

    #[test]
    fn separate_bin_and_resources() {
        let dir = temp_dir("resources");
        let gltf = dir.join("scene.gltf");
        let bin = dir.join("scene.bin");
        let resources = dir.join("textures");
        GltfEncoder::new()
            .encode_scene_file_with_resources(&triangle_scene(), &gltf, &bin, &resources)
            .unwrap();

        let json: serde_json::Value = serde_json::from_slice(&std::fs::read(&gltf).unwrap()).unwrap();
        assert_eq!(json["buffers"][0]["uri"], "scene.bin");
        assert_eq!(json["images"][0]["uri"], "textures/checker.png");
        assert!(bin.exists());
        assert!(resources.join("checker.png").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn failed_resource_write_leaves_no_primary_file() {
        let dir = temp_dir("blocked");
        let gltf = dir.join("scene.gltf");
        let bin = dir.join("scene.bin");
        // A regular file where the resource directory should be.
        let resources = dir.join("textures");
        std::fs::write(&resources, b"not a directory").unwrap();

        let err = GltfEncoder::new()
            .encode_scene_file_with_resources(&triangle_scene(), &gltf, &bin, &resources)
            .unwrap_err();
        assert!(matches!(err, Err::IoError(_)));
        assert!(!gltf.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn relative_uris() {
        assert_eq!(relative_uri(Path::new("out/scene.bin"), Path::new("out")), "scene.bin");
        assert_eq!(relative_uri(Path::new("scene.bin"), Path::new("")), "scene.bin");
        assert_eq!(relative_uri(Path::new("./out/tex/a.png"), Path::new("out")), "tex/a.png");
        assert_eq!(relative_uri(Path::new("bin/scene.bin"), Path::new("out")), "../bin/scene.bin");
        assert_eq!(relative_uri(Path::new("/data/scene.bin"), Path::new("/data/out")), "../scene.bin");
    }

    #[test]
    fn image_names_are_unique() {
        let mut used = Vec::new();
        let mut image = Image::new("image/png".to_string(), vec![]);
        image.set_name(Some("base color".to_string()));
        assert_eq!(image_file_name(&image, 0, &mut used), "base_color.png");
        assert_eq!(image_file_name(&image, 1, &mut used), "base_color_1.png");
        let unnamed = Image::new("image/jpeg".to_string(), vec![]);
        assert_eq!(image_file_name(&unnamed, 2, &mut used), "image2.jpg");
    }
}
