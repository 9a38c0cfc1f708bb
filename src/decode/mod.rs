use image::GenericImageView;
use thiserror::Error;

use crate::geometry::ImageSize;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("image {name} is empty")]
    Empty { name: String },
    #[error("failed to decode image {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("image {name} has zero-sized dimensions")]
    ZeroSized { name: String },
}

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// A successfully decoded image, reduced to what the editors need: its name
/// and intrinsic pixel dimensions.
///
/// Owned by exactly one editor; other components only ever see [`ImageSize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    name: String,
    size: ImageSize,
}

impl LoadedImage {
    pub fn new(name: impl Into<String>, size: ImageSize) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn size(&self) -> ImageSize {
        self.size
    }
}

pub trait ImageDecoder: Send + Sync {
    fn decode(&self, name: &str, bytes: &[u8]) -> DecodeResult<LoadedImage>;
}

/// Decoder backed by the `image` crate's format sniffing.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, name: &str, bytes: &[u8]) -> DecodeResult<LoadedImage> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty {
                name: name.to_string(),
            });
        }
        let pixels = image::load_from_memory(bytes).map_err(|err| DecodeError::Decode {
            name: name.to_string(),
            source: err,
        })?;
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(DecodeError::ZeroSized {
                name: name.to_string(),
            });
        }
        tracing::debug!(name, width, height, "decoded image");
        Ok(LoadedImage::new(name, ImageSize::new(width, height)))
    }
}

#[cfg(test)]
pub(crate) fn blank_image(name: &str, width: u32, height: u32) -> LoadedImage {
    LoadedImage::new(name, ImageSize::new(width, height))
}
