pub mod font;
pub mod resource;

pub use font::{FixedWidthMeasurer, FontSpec, StandardFamily, StandardMetrics, TextMeasurer};
pub use resource::{
    DecodedImage, ImageData, ImageDecoder, ImageFilter, InMemoryImageDecoder, NullImageDecoder,
    ResourceError, SharedResourceData,
};
