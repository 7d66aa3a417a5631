use std::path::Path;

use crate::core::scene::Scene;
use crate::io::gltf::decode::GltfDecoder;
use crate::io::gltf::encode::GltfEncoder;

#[remain::sorted]
#[derive(Debug, thiserror::Error)]
pub enum Err {
    #[error("Error: {0}")]
    Error(String),
    #[error("GLTF Decoder Error: {0}")]
    GltfDecoderError(#[from] crate::io::gltf::decode::Err),
    #[error("GLTF Encoder Error: {0}")]
    GltfEncoderError(#[from] crate::io::gltf::encode::Err),
}

/// Turns encoded bytes into a [`Scene`].
pub trait SceneDecoder {
    type Error: std::error::Error;

    /// Decodes the scene stored in `file_name`. Resources referenced by
    /// relative paths are resolved against the directory of the file.
    fn decode_file_to_scene(&mut self, file_name: &Path) -> Result<Scene, Self::Error>;

    /// Decodes a scene held entirely in memory.
    fn decode_buffer_to_scene(&mut self, buffer: &[u8]) -> Result<Scene, Self::Error>;
}

/// Turns a [`Scene`] into encoded bytes, either as files in one of three
/// output layouts or as a single in-memory buffer.
pub trait SceneEncoder {
    type Error: std::error::Error;

    /// Writes the scene as one self-contained file.
    fn encode_scene_file(&mut self, scene: &Scene, file_name: &Path) -> Result<(), Self::Error>;

    /// Writes the scene to `file_name` with the binary payload stored in `bin_file_name`.
    fn encode_scene_file_with_bin(
        &mut self,
        scene: &Scene,
        file_name: &Path,
        bin_file_name: &Path,
    ) -> Result<(), Self::Error>;

    /// Writes the scene to `file_name` with the binary payload stored in
    /// `bin_file_name` and the other resources (images) in `resource_dir`.
    fn encode_scene_file_with_resources(
        &mut self,
        scene: &Scene,
        file_name: &Path,
        bin_file_name: &Path,
        resource_dir: &Path,
    ) -> Result<(), Self::Error>;

    /// Encodes the scene into a single self-contained buffer.
    fn encode_scene_to_buffer(&mut self, scene: &Scene) -> Result<Vec<u8>, Self::Error>;
}

/// Supported scene file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneFileFormat {
    Unknown,
    Gltf,
    Usd,
    Ply,
    Obj,
}

/// Determines the scene file format based on the file extension.
pub fn get_scene_file_format<P: AsRef<Path>>(file_name: P) -> SceneFileFormat {
    let extension = match file_name.as_ref().extension().and_then(|ext| ext.to_str()) {
        Some(ext) => ext.to_lowercase(),
        None => return SceneFileFormat::Unknown,
    };

    match extension.as_str() {
        "gltf" | "glb" => SceneFileFormat::Gltf,
        "usd" | "usda" | "usdc" | "usdz" => SceneFileFormat::Usd,
        "obj" => SceneFileFormat::Obj,
        "ply" => SceneFileFormat::Ply,
        _ => SceneFileFormat::Unknown,
    }
}

/// Reads a scene from a file. Currently only glTF 2.0 scene files are supported.
pub fn read_scene_from_file<P: AsRef<Path>>(file_name: P) -> Result<Scene, Err> {
    let file_name = file_name.as_ref();
    match get_scene_file_format(file_name) {
        SceneFileFormat::Gltf => Ok(GltfDecoder::new().decode_file_to_scene(file_name)?),
        SceneFileFormat::Usd => Err(Err::Error("USD is not supported yet.".to_string())),
        _ => Err(Err::Error("Unknown input file format.".to_string())),
    }
}

/// Writes a scene into a file. Currently only glTF 2.0 scene files are supported.
pub fn write_scene_to_file<P: AsRef<Path>>(file_name: P, scene: &Scene) -> Result<(), Err> {
    let file_name = file_name.as_ref();
    match get_scene_file_format(file_name) {
        SceneFileFormat::Gltf => Ok(GltfEncoder::new().encode_scene_file(scene, file_name)?),
        SceneFileFormat::Usd => Err(Err::Error("USD is not supported yet.".to_string())),
        SceneFileFormat::Ply | SceneFileFormat::Obj => Err(Err::Error(
            "Writing scenes as PLY or OBJ is not supported.".to_string(),
        )),
        SceneFileFormat::Unknown => Err(Err::Error("Unknown output file format.".to_string())),
    }
}
