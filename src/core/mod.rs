pub mod attribute;
pub mod material;
pub mod mesh;
pub mod scene;
pub mod texture;
