use crate::core::texture::TextureRef;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum TransparencyMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

/// PBR metallic-roughness material.
#[derive(Clone, PartialEq, Debug)]
pub struct Material {
    pub name: Option<String>,
    pub color_factor: [f32; 4],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub emissive_factor: [f32; 3],
    pub double_sided: bool,
    pub transparency_mode: TransparencyMode,
    /// Only meaningful with [`TransparencyMode::Mask`].
    pub alpha_cutoff: Option<f32>,
    pub color_texture: Option<TextureRef>,
    pub metallic_roughness_texture: Option<TextureRef>,
    pub normal_texture: Option<TextureRef>,
    pub normal_texture_scale: f32,
    pub occlusion_texture: Option<TextureRef>,
    pub occlusion_strength: f32,
    pub emissive_texture: Option<TextureRef>,
}

impl Default for Material {
    fn default() -> Self {
        Self::new()
    }
}

impl Material {
    pub fn new() -> Self {
        Self {
            name: None,
            color_factor: [1.0, 1.0, 1.0, 1.0],
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            emissive_factor: [0.0, 0.0, 0.0],
            double_sided: false,
            transparency_mode: TransparencyMode::Opaque,
            alpha_cutoff: None,
            color_texture: None,
            metallic_roughness_texture: None,
            normal_texture: None,
            normal_texture_scale: 1.0,
            occlusion_texture: None,
            occlusion_strength: 1.0,
            emissive_texture: None,
        }
    }

    /// Indices of all scene textures referenced by this material.
    pub fn texture_indices(&self) -> impl Iterator<Item = usize> + '_ {
        [
            self.color_texture,
            self.metallic_roughness_texture,
            self.normal_texture,
            self.occlusion_texture,
            self.emissive_texture,
        ]
        .into_iter()
        .flatten()
        .map(|texture| texture.texture_index)
    }
}
