use crate::compression::CompressionOptions;
use crate::core::attribute::{Attribute, AttributeType};

#[remain::sorted]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Err {
    #[error("Attribute {0} has {1} values but the mesh has {2} points.")]
    AttributeSizeMismatch(String, usize, usize),
    #[error("Face {0} refers to point {1}, but the mesh has only {2} points.")]
    FaceOutOfRange(usize, u32, usize),
    #[error("Mesh has no position attribute.")]
    MissingPositions,
}

/// Represents a triangular 3D mesh.
/// It consists of a list of faces, where each face is defined by three point indices,
/// and a list of attributes ([Attribute]) holding one value per point.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    pub(crate) faces: Vec<[u32; 3]>,
    pub(crate) attributes: Vec<Attribute>,
    name: Option<String>,

    // Geometry compression settings stamped by the transcoder. They are
    // consumed by the encoder, not by the mesh itself.
    compression_enabled: bool,
    compression_options: Option<CompressionOptions>,
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            faces: Vec::new(),
            attributes: Vec::new(),
            name: None,
            compression_enabled: false,
            compression_options: None,
        }
    }

    /// Builds a mesh and checks that the faces and attributes agree on the
    /// number of points.
    pub fn from_parts(faces: Vec<[u32; 3]>, attributes: Vec<Attribute>) -> Result<Self, Err> {
        let mesh = Self {
            faces,
            attributes,
            ..Self::new()
        };
        mesh.validate()?;
        Ok(mesh)
    }

    pub fn get_attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn get_faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn get_attribute(&self, att_type: AttributeType, set_index: u32) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|att| att.get_attribute_type() == att_type && att.get_set_index() == set_index)
    }

    /// Number of points, taken from the position attribute.
    pub fn num_points(&self) -> usize {
        self.get_attribute(AttributeType::Position, 0)
            .map(|att| att.len())
            .unwrap_or(0)
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn is_compression_enabled(&self) -> bool {
        self.compression_enabled
    }

    pub fn set_compression_enabled(&mut self, enabled: bool) {
        self.compression_enabled = enabled;
    }

    pub fn get_compression_options(&self) -> Option<&CompressionOptions> {
        self.compression_options.as_ref()
    }

    pub fn set_compression_options(&mut self, options: Option<CompressionOptions>) {
        self.compression_options = options;
    }

    pub fn validate(&self) -> Result<(), Err> {
        let num_points = self
            .get_attribute(AttributeType::Position, 0)
            .ok_or(Err::MissingPositions)?
            .len();
        for att in &self.attributes {
            if att.len() != num_points {
                return Err(Err::AttributeSizeMismatch(att.gltf_semantic(), att.len(), num_points));
            }
        }
        for (i, face) in self.faces.iter().enumerate() {
            if let Some(&p) = face.iter().find(|&&p| p as usize >= num_points) {
                return Err(Err::FaceOutOfRange(i, p, num_points));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_positions() -> Attribute {
        Attribute::from_vectors(
            AttributeType::Position,
            0,
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        ).unwrap()
    }

    #[test]
    fn from_parts_checks_faces() {
        let mesh = Mesh::from_parts(vec![[0, 1, 2]], vec![triangle_positions()]).unwrap();
        assert_eq!(mesh.num_points(), 3);
        assert_eq!(mesh.num_faces(), 1);

        let err = Mesh::from_parts(vec![[0, 1, 3]], vec![triangle_positions()]).unwrap_err();
        assert_eq!(err, Err::FaceOutOfRange(0, 3, 3));
    }

    #[test]
    fn from_parts_checks_attribute_sizes() {
        let normals = Attribute::from_vectors(AttributeType::Normal, 0, &[[0.0, 0.0, 1.0]]).unwrap();
        let err = Mesh::from_parts(vec![[0, 1, 2]], vec![triangle_positions(), normals]).unwrap_err();
        assert_eq!(err, Err::AttributeSizeMismatch("NORMAL".to_string(), 1, 3));

        let err = Mesh::from_parts(Vec::new(), Vec::new()).unwrap_err();
        assert_eq!(err, Err::MissingPositions);
    }

    #[test]
    fn compression_settings_start_disabled() {
        let mesh = Mesh::new();
        assert!(!mesh.is_compression_enabled());
        assert!(mesh.get_compression_options().is_none());
    }
}
