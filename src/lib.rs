// lib.rs

/// Contains the byte endpoints, the scene decode/encode collaborators and the
/// transcoder that drives them.
pub mod io;

/// Contains the geometry compression options and their validation.
pub mod compression;

/// Contains the in-memory scene model: meshes, attributes, materials,
/// textures and the scene graph.
pub mod core;

/// Contains the most commonly used traits, types, and objects.
pub mod prelude {
    pub use crate::compression::{CompressionOptions, SpatialQuantization};
    pub use crate::core::attribute::{Attribute, AttributeType};
    pub use crate::core::mesh::Mesh;
    pub use crate::core::scene::Scene;
    pub use crate::io::endpoint::{ByteSink, ByteSource, FileEndpoint, MemoryEndpoint};
    pub use crate::io::gltf::decode::GltfDecoder;
    pub use crate::io::gltf::encode::GltfEncoder;
    pub use crate::io::gltf::transcoder::{
        self, transcode_file, DracoTranscoder, FileOptions, OutputLayout, TranscoderState, TranscodingOptions,
    };
    pub use crate::io::scene_io::{SceneDecoder, SceneEncoder};
}
