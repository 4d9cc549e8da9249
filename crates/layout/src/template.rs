//! Page templates: page size, content frames and running blocks.

use crate::error::LayoutError;
use folio_style::dimension::{Margins, PageSize};
use folio_types::geometry::Rect;
use serde::Deserialize;
use std::sync::Arc;

/// Text repeated on every page of a template. `{page}`, `{pages}`,
/// `{title}` and `{section}` are substituted when the page is finished.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningBlock {
    pub text: String,
    pub rect: Rect,
}

impl RunningBlock {
    pub fn uses_total_pages(&self) -> bool {
        self.text.contains("{pages}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageTemplate {
    pub name: Arc<str>,
    pub size: PageSize,
    /// Filled in order, each top to bottom.
    pub frames: Vec<Rect>,
    pub header: Option<RunningBlock>,
    pub footer: Option<RunningBlock>,
    /// Template of the following page, unless a page break names one.
    pub next: Option<Arc<str>>,
}

impl PageTemplate {
    /// One frame inside `margins`.
    pub fn single_column(name: &str, size: PageSize, margins: &Margins) -> Self {
        Self::columns(name, size, margins, 1, 0.0)
    }

    pub fn two_column(name: &str, size: PageSize, margins: &Margins, gap: f32) -> Self {
        Self::columns(name, size, margins, 2, gap)
    }

    /// `count` equal frames side by side inside `margins`.
    pub fn columns(name: &str, size: PageSize, margins: &Margins, count: usize, gap: f32) -> Self {
        let (w, h) = size.dimensions_pt();
        let body = Rect::new(0.0, 0.0, w, h).inset(margins.top, margins.right, margins.bottom, margins.left);
        let count = count.max(1);
        let width = ((body.width - gap * (count - 1) as f32) / count as f32).max(0.0);
        let frames = (0..count)
            .map(|i| Rect::new(body.x + i as f32 * (width + gap), body.y, width, body.height))
            .collect();
        Self {
            name: Arc::from(name),
            size,
            frames,
            header: None,
            footer: None,
            next: None,
        }
    }

    pub fn with_header(mut self, block: RunningBlock) -> Self {
        self.header = Some(block);
        self
    }

    pub fn with_footer(mut self, block: RunningBlock) -> Self {
        self.footer = Some(block);
        self
    }

    pub fn with_next(mut self, next: &str) -> Self {
        self.next = Some(Arc::from(next));
        self
    }

    pub fn dimensions(&self) -> (f32, f32) {
        self.size.dimensions_pt()
    }

    fn validate(&self) -> Result<(), String> {
        let (w, h) = self.dimensions();
        if self.frames.is_empty() {
            return Err(format!("template '{}' has no frames", self.name));
        }
        for (i, f) in self.frames.iter().enumerate() {
            if f.width <= 0.0 || f.height <= 0.0 {
                return Err(format!("frame {} of template '{}' is empty", i, self.name));
            }
            if f.x < 0.0 || f.y < 0.0 || f.right() > w + 0.01 || f.bottom() > h + 0.01 {
                return Err(format!("frame {} of template '{}' lies outside the page", i, self.name));
            }
        }
        Ok(())
    }
}

/// The templates of a conversion plus the names of the first and default ones.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSet {
    templates: Vec<PageTemplate>,
    first: usize,
    default: usize,
}

impl TemplateSet {
    /// Checks that every template has frames and every name resolves.
    pub fn new(templates: Vec<PageTemplate>, first: &str, default: &str) -> Result<Self, LayoutError> {
        if templates.is_empty() {
            return Err(LayoutError::InvalidTemplates("no templates defined".to_string()));
        }
        for (i, t) in templates.iter().enumerate() {
            t.validate().map_err(LayoutError::InvalidTemplates)?;
            if templates[..i].iter().any(|other| other.name == t.name) {
                return Err(LayoutError::InvalidTemplates(format!("duplicate template name '{}'", t.name)));
            }
        }
        let index_of = |name: &str| {
            templates
                .iter()
                .position(|t| &*t.name == name)
                .ok_or_else(|| LayoutError::UnknownTemplate(name.to_string()))
        };
        let first = index_of(first)?;
        let default = index_of(default)?;
        for t in &templates {
            if let Some(next) = &t.next {
                index_of(next)?;
            }
        }
        Ok(Self { templates, first, default })
    }

    /// A single template used for every page.
    pub fn single(template: PageTemplate) -> Result<Self, LayoutError> {
        template.validate().map_err(LayoutError::InvalidTemplates)?;
        Ok(Self { templates: vec![template], first: 0, default: 0 })
    }

    /// A4 with one-inch margins and a centered page number footer.
    pub fn standard() -> Self {
        let margins = Margins::all(72.0);
        let (w, h) = PageSize::A4.dimensions_pt();
        let template = PageTemplate::single_column("body", PageSize::A4, &margins).with_footer(RunningBlock {
            text: "{page}".to_string(),
            rect: Rect::new(72.0, h - 54.0, w - 144.0, 12.0),
        });
        Self { templates: vec![template], first: 0, default: 0 }
    }

    pub fn from_json(json: &str) -> Result<Self, LayoutError> {
        let def: TemplateSetDef = serde_json::from_str(json)?;
        def.into_set()
    }

    pub fn get(&self, name: &str) -> Option<&PageTemplate> {
        self.templates.iter().find(|t| &*t.name == name)
    }

    pub fn first_template(&self) -> &PageTemplate {
        &self.templates[self.first]
    }

    pub fn default_template(&self) -> &PageTemplate {
        &self.templates[self.default]
    }

    /// Template of the page after one using `current`.
    pub fn next_after<'s>(&'s self, current: &'s PageTemplate) -> &'s PageTemplate {
        current.next.as_deref().and_then(|n| self.get(n)).unwrap_or(current)
    }

    pub fn lookup(&self, name: &str) -> Result<&PageTemplate, LayoutError> {
        self.get(name).ok_or_else(|| LayoutError::UnknownTemplate(name.to_string()))
    }

    pub fn uses_total_pages(&self) -> bool {
        self.templates
            .iter()
            .flat_map(|t| t.header.iter().chain(t.footer.iter()))
            .any(RunningBlock::uses_total_pages)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageTemplate> {
        self.templates.iter()
    }
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::standard()
    }
}

// --- JSON form ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateSetDef {
    templates: Vec<TemplateDef>,
    first: Option<String>,
    default: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateDef {
    name: String,
    #[serde(default)]
    size: PageSize,
    #[serde(default)]
    margins: Option<Margins>,
    #[serde(default)]
    frames: Option<Vec<Rect>>,
    #[serde(default = "one")]
    columns: usize,
    #[serde(default)]
    gap: f32,
    header: Option<RunningDef>,
    footer: Option<RunningDef>,
    next: Option<String>,
}

fn one() -> usize {
    1
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunningDef {
    text: String,
    rect: Option<Rect>,
    #[serde(default = "running_height")]
    height: f32,
}

fn running_height() -> f32 {
    12.0
}

impl TemplateSetDef {
    fn into_set(self) -> Result<TemplateSet, LayoutError> {
        let first_name = self.templates.first().map(|t| t.name.clone());
        let first = self
            .first
            .or_else(|| first_name.clone())
            .ok_or_else(|| LayoutError::InvalidTemplates("no templates defined".to_string()))?;
        let default = self.default.or(first_name).unwrap_or_else(|| first.clone());
        let templates = self.templates.into_iter().map(TemplateDef::into_template).collect();
        TemplateSet::new(templates, &first, &default)
    }
}

impl TemplateDef {
    fn into_template(self) -> PageTemplate {
        let margins = self.margins.unwrap_or_else(|| Margins::all(72.0));
        let mut template = PageTemplate::columns(&self.name, self.size.clone(), &margins, self.columns, self.gap);
        if let Some(frames) = self.frames {
            template.frames = frames;
        }
        let (w, h) = template.dimensions();
        let body_width = (w - margins.left - margins.right).max(0.0);
        template.header = self.header.map(|r| RunningBlock {
            rect: r.rect.unwrap_or_else(|| {
                Rect::new(margins.left, ((margins.top - r.height) / 2.0).max(0.0), body_width, r.height)
            }),
            text: r.text,
        });
        template.footer = self.footer.map(|r| RunningBlock {
            rect: r.rect.unwrap_or_else(|| {
                Rect::new(margins.left, h - margins.bottom + ((margins.bottom - r.height) / 2.0).max(0.0), body_width, r.height)
            }),
            text: r.text,
        });
        template.next = self.next.map(Arc::from);
        template
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_columns_split_the_body() {
        let t = PageTemplate::two_column("t", PageSize::Letter, &Margins::all(72.0), 12.0);
        assert_eq!(t.frames.len(), 2);
        assert_eq!(t.frames[0].width, t.frames[1].width);
        assert!((t.frames[1].right() - (612.0 - 72.0)).abs() < 0.01);
        assert!((t.frames[1].x - t.frames[0].right() - 12.0).abs() < 0.01);
    }

    #[test]
    fn loads_from_json() {
        let set = TemplateSet::from_json(
            r#"{
                "first": "cover",
                "default": "body",
                "templates": [
                    {"name": "cover", "size": "A4", "margins": 144, "next": "body"},
                    {"name": "body", "size": "A4", "margins": "1in", "columns": 2, "gap": 18,
                     "footer": {"text": "Page {page} of {pages}"}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(&*set.first_template().name, "cover");
        assert_eq!(&*set.next_after(set.first_template()).name, "body");
        assert_eq!(set.default_template().frames.len(), 2);
        assert!(set.uses_total_pages());
    }

    #[test]
    fn rejects_unknown_names_and_empty_frames() {
        let err = TemplateSet::from_json(r#"{"templates": [{"name": "a", "next": "b"}]}"#).unwrap_err();
        assert!(matches!(err, LayoutError::UnknownTemplate(name) if name == "b"));

        let err = TemplateSet::from_json(r#"{"templates": [{"name": "a", "frames": []}]}"#).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidTemplates(_)));
    }
}
