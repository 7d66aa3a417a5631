#[remain::sorted]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Err {
	#[error("{0:?} attribute must have {1} components, got {2}.")]
	InvalidComponentCount(AttributeType, usize, usize),
	#[error("Attribute data of length {0} is not a multiple of {1} components.")]
	RaggedData(usize, usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeType {
	Position,
	Normal,
	Tangent,
	TextureCoordinate,
	Color,
}

impl AttributeType {
	/// Number of float components per value, as stored in the scene.
	pub fn num_components(&self) -> usize {
		match self {
			Self::Position => 3,
			Self::Normal => 3,
			Self::Tangent => 4,
			Self::TextureCoordinate => 2,
			Self::Color => 4,
		}
	}
}

/// Per-vertex float attribute of a mesh. Values are stored interleaved, i.e.
/// `values[i * num_components + c]` is component `c` of vertex `i`.
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
	att_type: AttributeType,
	/// Set index for multi-set attributes (`TEXCOORD_n`, `COLOR_n`).
	set_index: u32,
	values: Vec<f32>,
}

impl Attribute {
	pub fn new(att_type: AttributeType, set_index: u32, values: Vec<f32>) -> Result<Self, Err> {
		let n = att_type.num_components();
		if values.len() % n != 0 {
			return Err(Err::RaggedData(values.len(), n));
		}
		Ok(Self { att_type, set_index, values })
	}

	/// Builds an attribute from fixed-size vectors.
	pub fn from_vectors<const N: usize>(att_type: AttributeType, set_index: u32, data: &[[f32; N]]) -> Result<Self, Err> {
		if N != att_type.num_components() {
			return Err(Err::InvalidComponentCount(att_type, att_type.num_components(), N));
		}
		let values = data.iter().flat_map(|v| v.iter().copied()).collect();
		Ok(Self { att_type, set_index, values })
	}

	pub fn get_attribute_type(&self) -> AttributeType {
		self.att_type
	}

	pub fn get_set_index(&self) -> u32 {
		self.set_index
	}

	pub fn get_num_components(&self) -> usize {
		self.att_type.num_components()
	}

	pub fn len(&self) -> usize {
		self.values.len() / self.get_num_components()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	pub fn get_values(&self) -> &[f32] {
		&self.values
	}

	/// Attribute name as used by glTF, e.g. `POSITION` or `TEXCOORD_1`.
	pub fn gltf_semantic(&self) -> String {
		match self.att_type {
			AttributeType::Position => "POSITION".to_string(),
			AttributeType::Normal => "NORMAL".to_string(),
			AttributeType::Tangent => "TANGENT".to_string(),
			AttributeType::TextureCoordinate => format!("TEXCOORD_{}", self.set_index),
			AttributeType::Color => format!("COLOR_{}", self.set_index),
		}
	}

	/// Component-wise minimum and maximum over all values.
	pub fn bounds(&self) -> Option<(Vec<f32>, Vec<f32>)> {
		let n = self.get_num_components();
		let mut chunks = self.values.chunks_exact(n);
		let first = chunks.next()?;
		let mut min = first.to_vec();
		let mut max = first.to_vec();
		for value in chunks {
			for c in 0..n {
				min[c] = min[c].min(value[c]);
				max[c] = max[c].max(value[c]);
			}
		}
		Some((min, max))
	}
}
