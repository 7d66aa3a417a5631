use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[remain::sorted]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Err {
    #[error("Invalid compression options: {0}")]
    InvalidOption(String),
    #[error("Failed to read compression options: {0}")]
    IoError(String),
    #[error("Failed to parse compression options: {0}")]
    ParseError(String),
}

/// Quantization of the position attribute. Positions are either quantized to a
/// fixed number of bits over the bounding box of the mesh, or snapped to a
/// regular grid with the given spacing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SpatialQuantization {
    Bits(i32),
    Grid { spacing: f32 },
}

impl Default for SpatialQuantization {
    fn default() -> Self {
        SpatialQuantization::Bits(11)
    }
}

/// Geometry compression settings applied to every mesh of a transcoded scene.
/// A quantization value of 0 disables quantization of that attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CompressionOptions {
    /// Speed/size trade-off of the encoder, 0 (fastest) to 10 (smallest).
    pub compression_level: i32,
    pub quantization_position: SpatialQuantization,
    pub quantization_bits_normal: i32,
    pub quantization_bits_tex_coord: i32,
    pub quantization_bits_color: i32,
    pub quantization_bits_generic: i32,
    pub quantization_bits_tangent: i32,
    pub quantization_bits_weight: i32,
    /// Searches for the lowest texture coordinate quantization that does not
    /// collapse any triangle in UV space.
    pub find_non_degenerate_texture_quantization: bool,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            compression_level: 7,
            quantization_position: SpatialQuantization::default(),
            quantization_bits_normal: 8,
            quantization_bits_tex_coord: 10,
            quantization_bits_color: 8,
            quantization_bits_generic: 8,
            quantization_bits_tangent: 8,
            quantization_bits_weight: 8,
            find_non_degenerate_texture_quantization: false,
        }
    }
}

impl CompressionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks that every option lies in its valid range. The error names the
    /// first inconsistent option.
    pub fn check(&self) -> Result<(), Err> {
        validate("Compression level", self.compression_level, 0, 10)?;
        match self.quantization_position {
            SpatialQuantization::Bits(bits) => validate("Position quantization", bits, 0, 30)?,
            SpatialQuantization::Grid { spacing } => {
                // Also rejects NaN.
                if !(spacing > 0.0) {
                    return Err(Err::InvalidOption(
                        "Position quantization spacing is invalid.".to_string(),
                    ));
                }
            }
        }
        validate("Normals quantization", self.quantization_bits_normal, 0, 30)?;
        validate("Tex coord quantization", self.quantization_bits_tex_coord, 0, 30)?;
        validate("Color quantization", self.quantization_bits_color, 0, 30)?;
        validate("Generic quantization", self.quantization_bits_generic, 0, 30)?;
        validate("Tangent quantization", self.quantization_bits_tangent, 0, 30)?;
        validate("Weights quantization", self.quantization_bits_weight, 0, 30)?;
        Ok(())
    }

    /// Parses options from JSON. Missing fields take their default value.
    pub fn from_json_str(json: &str) -> Result<Self, Err> {
        serde_json::from_str(json).map_err(|e| Err::ParseError(e.to_string()))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Err> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Err::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// JSON schema of the configuration file accepted by [`Self::from_json_str`].
    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(CompressionOptions)
    }

    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    pub fn with_position_quantization_bits(mut self, bits: i32) -> Self {
        self.quantization_position = SpatialQuantization::Bits(bits);
        self
    }

    pub fn with_position_grid_spacing(mut self, spacing: f32) -> Self {
        self.quantization_position = SpatialQuantization::Grid { spacing };
        self
    }
}

fn validate(name: &str, value: i32, min: i32, max: i32) -> Result<(), Err> {
    if value < min || value > max {
        return Err(Err::InvalidOption(format!(
            "{} is out of range [{}-{}].",
            name, min, max
        )));
    }
    Ok(())
}
