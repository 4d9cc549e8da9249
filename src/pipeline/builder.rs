// src/pipeline/builder.rs
use super::config::ConversionConfig;
use super::Pipeline;
use crate::error::PipelineError;
use folio_layout::TemplateSet;
use folio_style::stylesheet::StyleSheet;
use folio_traits::{DecodedImage, ImageDecoder, InMemoryImageDecoder, NullImageDecoder, StandardMetrics, TextMeasurer};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Where images come from: either a decoder supplied by the caller or images
/// registered on the builder.
enum Images {
    Decoder(Arc<dyn ImageDecoder>),
    Registered(InMemoryImageDecoder),
}

/// A builder for creating a [`Pipeline`].
pub struct PipelineBuilder {
    stylesheet: StyleSheet,
    templates: Option<TemplateSet>,
    measurer: Option<Arc<dyn TextMeasurer>>,
    images: Images,
    config: ConversionConfig,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self {
            stylesheet: StyleSheet::standard(),
            templates: None,
            measurer: None,
            images: Images::Registered(InMemoryImageDecoder::new()),
            config: ConversionConfig::default(),
        }
    }
}

fn read_source(path: &Path, what: &str) -> Result<String, PipelineError> {
    fs::read_to_string(path).map_err(|e| {
        PipelineError::Io(io::Error::new(
            e.kind(),
            format!("Failed to read {} from '{}': {}", what, path.display(), e),
        ))
    })
}

impl PipelineBuilder {
    /// Creates a `PipelineBuilder` with the standard style sheet, A4 pages,
    /// standard font metrics and no images.
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends `sheet` to the current style sheet. Its rules win ties.
    pub fn with_stylesheet(mut self, sheet: StyleSheet) -> Self {
        self.stylesheet.extend(sheet);
        self
    }

    /// Replaces the style sheet, dropping the standard rules.
    pub fn with_base_stylesheet(mut self, sheet: StyleSheet) -> Self {
        self.stylesheet = sheet;
        self
    }

    pub fn with_stylesheet_json(self, json: &str) -> Result<Self, PipelineError> {
        let sheet = StyleSheet::from_json(json)?;
        Ok(self.with_stylesheet(sheet))
    }

    pub fn with_stylesheet_file<P: AsRef<Path>>(self, path: P) -> Result<Self, PipelineError> {
        let source = read_source(path.as_ref(), "style sheet")?;
        self.with_stylesheet_json(&source)
    }

    pub fn with_templates(mut self, templates: TemplateSet) -> Self {
        self.templates = Some(templates);
        self
    }

    pub fn with_templates_json(self, json: &str) -> Result<Self, PipelineError> {
        let templates = TemplateSet::from_json(json)?;
        Ok(self.with_templates(templates))
    }

    pub fn with_templates_file<P: AsRef<Path>>(self, path: P) -> Result<Self, PipelineError> {
        let source = read_source(path.as_ref(), "page templates")?;
        self.with_templates_json(&source)
    }

    /// Selects the font metrics text is measured with.
    pub fn with_measurer(mut self, measurer: Arc<dyn TextMeasurer>) -> Self {
        self.measurer = Some(measurer);
        self
    }

    /// Uses `decoder` for every image. Images registered with
    /// [`with_image`](Self::with_image) are discarded.
    pub fn with_image_decoder(mut self, decoder: Arc<dyn ImageDecoder>) -> Self {
        self.images = Images::Decoder(decoder);
        self
    }

    /// Registers an already decoded image under the `src` documents use.
    pub fn with_image(self, src: impl Into<String>, image: DecodedImage) -> Result<Self, PipelineError> {
        match &self.images {
            Images::Registered(store) => store.add(src, image)?,
            Images::Decoder(_) => {
                return Err(PipelineError::Config(
                    "Images cannot be registered once a custom image decoder is set.".to_string(),
                ));
            }
        }
        Ok(self)
    }

    pub fn with_config(mut self, config: ConversionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_config_json(self, json: &str) -> Result<Self, PipelineError> {
        Ok(self.with_config(ConversionConfig::from_json(json)?))
    }

    pub fn with_config_file<P: AsRef<Path>>(self, path: P) -> Result<Self, PipelineError> {
        Ok(self.with_config(ConversionConfig::from_file(path)?))
    }

    /// Consumes the builder and creates the `Pipeline`.
    pub fn build(self) -> Result<Pipeline, PipelineError> {
        self.config.validate()?;
        let measurer = self.measurer.unwrap_or_else(|| Arc::new(StandardMetrics::new()));
        let images: Arc<dyn ImageDecoder> = match self.images {
            Images::Decoder(decoder) => decoder,
            Images::Registered(store) if store.is_empty() => Arc::new(NullImageDecoder),
            Images::Registered(store) => Arc::new(store),
        };
        let templates = self.templates.unwrap_or_default();
        log::info!(
            "Pipeline configured: {} style rules, {} page templates, measurer {}, images {}.",
            self.stylesheet.rules.len(),
            templates.iter().count(),
            measurer.name(),
            images.name()
        );
        Ok(Pipeline {
            stylesheet: Arc::new(self.stylesheet),
            templates: Arc::new(templates),
            measurer,
            images,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build() {
        let pipeline = PipelineBuilder::new().build().unwrap();
        assert_eq!(pipeline.config(), &ConversionConfig::default());
        assert_eq!(&*pipeline.templates().first_template().name, "body");
    }

    #[test]
    fn user_rules_are_appended() {
        let standard = StyleSheet::standard().rules.len();
        let pipeline = PipelineBuilder::new()
            .with_stylesheet_json(r#"{"rules": [{"kind": "paragraph", "style": {"fontSize": 11}}]}"#)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(pipeline.stylesheet().rules.len(), standard + 1);
        let pipeline = PipelineBuilder::new().with_base_stylesheet(StyleSheet::new()).build().unwrap();
        assert!(pipeline.stylesheet().rules.is_empty());
    }

    #[test]
    fn missing_files_report_the_path() {
        let err = PipelineBuilder::new().with_templates_file("/nonexistent/templates.json").err().unwrap();
        match err {
            PipelineError::Io(e) => assert!(e.to_string().contains("/nonexistent/templates.json")),
            other => panic!("expected an I/O error, got {other:?}"),
        }
    }

    #[test]
    fn images_cannot_mix_with_custom_decoder() {
        let err = PipelineBuilder::new()
            .with_image_decoder(Arc::new(NullImageDecoder))
            .with_image("logo.png", DecodedImage::size_only(10, 10))
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
