//! ImageDecoder trait for abstracting image loading.
//!
//! The compiler never reads files or parses image formats. It asks an
//! [`ImageDecoder`] for the pixel size of an image and, optionally, samples it
//! can embed.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Error type for resource loading operations.
#[derive(Error, Debug, Clone)]
pub enum ResourceError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Failed to load resource '{path}': {message}")]
    LoadFailed { path: String, message: String },

    #[error("Invalid resource format: {0}")]
    InvalidFormat(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ResourceError {
    fn from(err: std::io::Error) -> Self {
        ResourceError::Io(err.to_string())
    }
}

/// Shared resource data type (reference-counted bytes).
pub type SharedResourceData = Arc<Vec<u8>>;

/// How the sample bytes of an [`ImageData`] are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFilter {
    /// Uncompressed samples, row by row.
    Raw,
    /// A baseline JPEG stream, embedded as is.
    Dct,
}

/// Embeddable samples of a decoded image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    /// Sample grid in pixels.
    pub width: u32,
    pub height: u32,
    /// 1 (gray) or 3 (RGB).
    pub components: u8,
    pub bits_per_component: u8,
    pub filter: ImageFilter,
    pub bytes: SharedResourceData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width_px: u32,
    pub height_px: u32,
    /// Resolution stored in the image, if any.
    pub dpi: Option<f32>,
    /// `None` when only the size is known; the renderer then draws a frame.
    pub data: Option<ImageData>,
}

impl DecodedImage {
    pub fn size_only(width_px: u32, height_px: u32) -> Self {
        Self { width_px, height_px, dpi: None, data: None }
    }

    /// Natural size in points at the image's own resolution or `default_dpi`.
    pub fn natural_size_pt(&self, default_dpi: f32) -> (f32, f32) {
        let dpi = self.dpi.filter(|d| *d > 0.0).unwrap_or(default_dpi).max(1.0);
        (
            self.width_px as f32 * 72.0 / dpi,
            self.height_px as f32 * 72.0 / dpi,
        )
    }
}

/// A trait for decoding images referenced by the document.
///
/// Implementations are shared across concurrent conversions and must not
/// require exclusive access.
pub trait ImageDecoder: Send + Sync + Debug {
    /// Decode the image at `src` (a path, URI or data key).
    fn decode(&self, src: &str) -> Result<DecodedImage, ResourceError>;

    /// Returns a human-readable name for this decoder (for logging/debugging).
    fn name(&self) -> &'static str;
}

/// A decoder that knows no images. Every image becomes a placeholder.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullImageDecoder;

impl ImageDecoder for NullImageDecoder {
    fn decode(&self, src: &str) -> Result<DecodedImage, ResourceError> {
        Err(ResourceError::NotFound(src.to_string()))
    }

    fn name(&self) -> &'static str {
        "NullImageDecoder"
    }
}

/// An in-memory image decoder.
///
/// Images are registered up front under the `src` the document uses.
#[derive(Debug, Default)]
pub struct InMemoryImageDecoder {
    images: RwLock<HashMap<String, DecodedImage>>,
}

impl InMemoryImageDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an image.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError::LoadFailed` if the internal lock is poisoned.
    pub fn add(&self, src: impl Into<String>, image: DecodedImage) -> Result<(), ResourceError> {
        let src = src.into();
        let mut images = self.images.write().map_err(|_| ResourceError::LoadFailed {
            path: src.clone(),
            message: "image store lock poisoned".to_string(),
        })?;
        images.insert(src, image);
        Ok(())
    }

    /// Builder-style variant of [`add`](Self::add) for setting up decoders in one expression.
    pub fn with_image(self, src: impl Into<String>, image: DecodedImage) -> Result<Self, ResourceError> {
        self.add(src, image)?;
        Ok(self)
    }

    /// Returns 0 if the lock is poisoned.
    pub fn len(&self) -> usize {
        self.images.read().map(|i| i.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ImageDecoder for InMemoryImageDecoder {
    fn decode(&self, src: &str) -> Result<DecodedImage, ResourceError> {
        let images = self.images.read().map_err(|_| ResourceError::LoadFailed {
            path: src.to_string(),
            message: "image store lock poisoned".to_string(),
        })?;
        images
            .get(src)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(src.to_string()))
    }

    fn name(&self) -> &'static str {
        "InMemoryImageDecoder"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_decoder_add_and_decode() {
        let decoder = InMemoryImageDecoder::new();
        decoder.add("logo.png", DecodedImage::size_only(300, 150)).unwrap();

        let image = decoder.decode("logo.png").unwrap();
        assert_eq!((image.width_px, image.height_px), (300, 150));
        assert_eq!(decoder.len(), 1);
    }

    #[test]
    fn test_in_memory_decoder_not_found() {
        let decoder = InMemoryImageDecoder::new();
        assert!(decoder.is_empty());
        let result = decoder.decode("missing.png");
        assert!(matches!(result, Err(ResourceError::NotFound(_))));
    }

    #[test]
    fn test_null_decoder_never_finds() {
        assert!(NullImageDecoder.decode("a.png").is_err());
        assert_eq!(NullImageDecoder.name(), "NullImageDecoder");
    }

    #[test]
    fn test_natural_size_uses_dpi() {
        let mut image = DecodedImage::size_only(300, 600);
        assert_eq!(image.natural_size_pt(300.0), (72.0, 144.0));
        image.dpi = Some(72.0);
        assert_eq!(image.natural_size_pt(300.0), (300.0, 600.0));
    }

    #[test]
    fn test_resource_error_display() {
        let err = ResourceError::NotFound("test.png".to_string());
        assert!(err.to_string().contains("test.png"));

        let err = ResourceError::LoadFailed {
            path: "file.bin".to_string(),
            message: "permission denied".to_string(),
        };
        assert!(err.to_string().contains("file.bin"));
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_resource_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let resource_err: ResourceError = io_err.into();
        assert!(matches!(resource_err, ResourceError::Io(_)));
    }
}
