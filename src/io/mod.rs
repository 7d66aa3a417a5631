/// Byte endpoints scenes are read from and written to.
pub mod endpoint;

/// glTF 2.0 decoder and encoder, and the transcoder built on them.
pub mod gltf;

/// Decode/encode collaborator traits and scene file helpers.
pub mod scene_io;
