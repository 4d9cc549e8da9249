// src/pipeline/config.rs
use crate::error::PipelineError;
use folio_layout::flow::{BreakSide, FootnoteMode};
use folio_layout::{FlowConfig, LayoutConfig};
use folio_render_lopdf::EmitOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// Options of one conversion. Every field has a default, so a JSON
/// configuration only names what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionConfig {
    /// Sections at this level or above start a new page. `0` never breaks.
    pub break_level: u8,
    /// Page parity a section break must land on.
    pub break_side: BreakSide,
    pub footnote_mode: FootnoteMode,
    /// Allow tables to break between rows.
    pub split_tables: bool,
    /// Repeat header rows on every page a table continues on.
    pub repeat_table_header: bool,
    /// Deepest section level listed by a contents node; unlimited when absent.
    pub toc_depth: Option<u8>,
    pub toc_title: String,
    /// Resolution assumed for images that do not carry one.
    pub default_dpi: f32,
    /// Vertical space between sibling sections, in points.
    pub section_spacing: f32,
    /// Deflate page content streams.
    pub compress: bool,
    /// Upper bound on layout passes while page references settle.
    pub max_passes: usize,
    pub max_split_retries: u32,
    /// Rendered where a page number is not known yet.
    pub placeholder: String,
    pub title: Option<String>,
    pub author: Option<String>,
    /// PDF date string, e.g. `D:20240101000000Z`. Omitted output carries no
    /// timestamp.
    pub creation_date: Option<String>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        let flow = FlowConfig::default();
        let layout = LayoutConfig::default();
        Self {
            break_level: 0,
            break_side: BreakSide::Any,
            footnote_mode: FootnoteMode::Page,
            split_tables: true,
            repeat_table_header: false,
            toc_depth: None,
            toc_title: flow.toc_title,
            default_dpi: 300.0,
            section_spacing: 6.0,
            compress: false,
            max_passes: 10,
            max_split_retries: layout.max_split_retries,
            placeholder: layout.placeholder,
            title: None,
            author: None,
            creation_date: None,
        }
    }
}

impl ConversionConfig {
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path_ref = path.as_ref();
        let source = fs::read_to_string(path_ref).map_err(|e| {
            PipelineError::Io(io::Error::new(
                e.kind(),
                format!("Failed to read configuration from '{}': {}", path_ref.display(), e),
            ))
        })?;
        Self::from_json(&source)
    }

    /// Rejects values no conversion can run with.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_passes == 0 {
            return Err(PipelineError::Config("maxPasses must be at least 1".to_string()));
        }
        if self.default_dpi.is_nan() || self.default_dpi <= 0.0 {
            return Err(PipelineError::Config(format!("defaultDpi must be positive, got {}", self.default_dpi)));
        }
        if self.section_spacing < 0.0 || !self.section_spacing.is_finite() {
            return Err(PipelineError::Config(format!(
                "sectionSpacing must be a non-negative length, got {}",
                self.section_spacing
            )));
        }
        Ok(())
    }

    pub fn flow_config(&self) -> FlowConfig {
        FlowConfig {
            break_level: self.break_level,
            break_side: self.break_side,
            footnote_mode: self.footnote_mode,
            split_tables: self.split_tables,
            repeat_table_header: self.repeat_table_header,
            toc_depth: self.toc_depth,
            toc_title: self.toc_title.clone(),
            section_spacing: self.section_spacing,
            default_dpi: self.default_dpi,
        }
    }

    pub fn layout_config(&self) -> LayoutConfig {
        LayoutConfig {
            max_split_retries: self.max_split_retries,
            placeholder: self.placeholder.clone(),
            title: self.title.clone(),
            ..LayoutConfig::default()
        }
    }

    pub fn emit_options(&self) -> EmitOptions {
        EmitOptions {
            compress: self.compress,
            title: self.title.clone(),
            author: self.author.clone(),
            creation_date: self.creation_date.clone(),
            ..EmitOptions::default()
        }
    }
}
