pub mod decode;
pub mod encode;
pub mod transcoder;

use serde::{Deserialize, Serialize};

use crate::compression::CompressionOptions;

pub(crate) const COMPONENT_TYPE_FLOAT: u32 = 5126;
pub(crate) const COMPONENT_TYPE_UNSIGNED_INT: u32 = 5125;
pub(crate) const TARGET_ARRAY_BUFFER: u32 = 34962;
pub(crate) const TARGET_ELEMENT_ARRAY_BUFFER: u32 = 34963;

/// Application data stored in the `extras` of every encoded primitive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PrimitiveExtras {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_options: Option<CompressionOptions>,
}

impl PrimitiveExtras {
    pub fn is_empty(&self) -> bool {
        self.compression_options.is_none()
    }
}
