/// Encoded image data as stored in the source asset. Pixels are never decoded
/// by the transcoder; the bytes are carried through unchanged.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Image {
    name: Option<String>,
    mime_type: String,
    encoded_data: Vec<u8>,
}

impl Image {
    pub fn new(mime_type: String, encoded_data: Vec<u8>) -> Self {
        Self {
            name: None,
            mime_type,
            encoded_data,
        }
    }

    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn get_mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn get_encoded_data(&self) -> &[u8] {
        &self.encoded_data
    }

    /// File extension matching the mime type, used when the image is written
    /// as a separate resource file.
    pub fn file_extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            "image/ktx2" => "ktx2",
            "image/gif" => "gif",
            "image/bmp" => "bmp",
            _ => "bin",
        }
    }
}

/// Sampler parameters as glTF enum values. `None` filters leave the choice
/// to the renderer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Sampler {
    pub mag_filter: Option<u32>,
    pub min_filter: Option<u32>,
    pub wrap_s: u32,
    pub wrap_t: u32,
}

impl Default for Sampler {
    fn default() -> Self {
        Self {
            mag_filter: None,
            min_filter: None,
            wrap_s: Self::WRAP_REPEAT,
            wrap_t: Self::WRAP_REPEAT,
        }
    }
}

impl Sampler {
    pub const WRAP_REPEAT: u32 = 10497;

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Texture {
    image_index: usize,
    sampler: Sampler,
}

impl Texture {
    pub fn new(image_index: usize) -> Self {
        Self {
            image_index,
            sampler: Sampler::default(),
        }
    }

    pub fn with_sampler(mut self, sampler: Sampler) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn get_image_index(&self) -> usize {
        self.image_index
    }

    pub fn get_sampler(&self) -> &Sampler {
        &self.sampler
    }
}

/// Reference from a material slot to a scene texture.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct TextureRef {
    pub texture_index: usize,
    pub tex_coord: u32,
}

impl TextureRef {
    pub fn new(texture_index: usize) -> Self {
        Self {
            texture_index,
            tex_coord: 0,
        }
    }
}

/// Mime type of an encoded image, sniffed from its magic bytes.
pub fn guess_mime_type(encoded_data: &[u8]) -> Option<&'static str> {
    image::guess_format(encoded_data)
        .ok()
        .map(|format| format.to_mime_type())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn sniff_png() {
        assert_eq!(guess_mime_type(&PNG_MAGIC), Some("image/png"));
        assert_eq!(guess_mime_type(b"not an image"), None);
    }

    #[test]
    fn extension_from_mime_type() {
        assert_eq!(Image::new("image/jpeg".to_string(), Vec::new()).file_extension(), "jpg");
        assert_eq!(Image::new("image/png".to_string(), Vec::new()).file_extension(), "png");
        assert_eq!(Image::new("application/x-unknown".to_string(), Vec::new()).file_extension(), "bin");
    }

    #[test]
    fn default_sampler() {
        assert!(Sampler::default().is_default());
        let sampler = Sampler { mag_filter: Some(9729), ..Sampler::default() };
        assert!(!sampler.is_default());
    }
}
