//! Name-based property access for hosts that drive the viewer reflectively.

use serde::Serialize;
use tracing::warn;

use crate::document::Document;
use crate::error::ViewerError;
use crate::pages::PageInfo;
use crate::render::{Canvas, FrameStats};
use crate::scroll::Viewport;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Nil,
    Number(f64),
    Integer(i64),
    Text(String),
    List(Vec<String>),
    Pages(Vec<PageInfo>),
    Scroll(ScrollSnapshot),
}

impl PropertyValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(value) => Some(*value),
            PropertyValue::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    fn optional_text(text: Option<&str>) -> Self {
        text.map_or(PropertyValue::Nil, |text| PropertyValue::Text(text.to_owned()))
    }
}

/// Scroll state as seen by hosts. `xmax`/`ymax` are the largest offsets the
/// axes accept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScrollSnapshot {
    pub x: f64,
    pub y: f64,
    pub xmax: f64,
    pub ymax: f64,
    pub xpage_size: f64,
    pub ypage_size: f64,
}

impl From<&Viewport> for ScrollSnapshot {
    fn from(viewport: &Viewport) -> Self {
        Self {
            x: viewport.horizontal.value(),
            y: viewport.vertical.value(),
            xmax: viewport.horizontal.max_value(),
            ymax: viewport.vertical.max_value(),
            xpage_size: viewport.horizontal.page_size(),
            ypage_size: viewport.vertical.page_size(),
        }
    }
}

/// What a host needs from an embeddable viewer component.
pub trait Widget {
    fn paint(&mut self, canvas: &mut dyn Canvas) -> FrameStats;

    /// `None` for unknown names.
    fn property(&self, name: &str) -> Option<PropertyValue>;

    /// Unknown names are ignored.
    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), ViewerError>;

    fn destroy(&mut self);
}

const READ_ONLY: &[&str] = &[
    "current_page",
    "pages",
    "scroll",
    "scroll.xmax",
    "scroll.ymax",
    "scroll.xpage_size",
    "scroll.ypage_size",
    "title",
    "author",
    "subject",
    "keywords",
    "creator",
    "producer",
];

impl Widget for Document {
    fn paint(&mut self, canvas: &mut dyn Canvas) -> FrameStats {
        self.render(canvas)
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        let scroll = self.scroll();
        let value = match name {
            "path" => PropertyValue::optional_text(self.path().and_then(|path| path.to_str())),
            "password" => PropertyValue::optional_text(self.password()),
            "zoom" => PropertyValue::Number(self.zoom()),
            "current_page" => PropertyValue::Integer(self.current_page_number() as i64),
            "pages" => PropertyValue::Pages(self.pages()),
            "scroll" => PropertyValue::Scroll(scroll),
            "scroll.x" => PropertyValue::Number(scroll.x),
            "scroll.y" => PropertyValue::Number(scroll.y),
            "scroll.xmax" => PropertyValue::Number(scroll.xmax),
            "scroll.ymax" => PropertyValue::Number(scroll.ymax),
            "scroll.xpage_size" => PropertyValue::Number(scroll.xpage_size),
            "scroll.ypage_size" => PropertyValue::Number(scroll.ypage_size),
            "title" | "author" | "subject" | "keywords" | "creator" | "producer" => {
                let Some(metadata) = self.metadata() else {
                    return Some(PropertyValue::Nil);
                };
                let field = match name {
                    "title" => metadata.title,
                    "author" => metadata.author,
                    "subject" => metadata.subject,
                    "creator" => metadata.creator,
                    "producer" => metadata.producer,
                    _ => return Some(PropertyValue::List(metadata.keywords)),
                };
                field.map_or(PropertyValue::Nil, PropertyValue::Text)
            }
            _ => return None,
        };
        Some(value)
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), ViewerError> {
        match (name, value) {
            ("path", PropertyValue::Text(path)) => self.set_path(path),
            ("password", PropertyValue::Text(password)) => self.set_password(Some(password)),
            ("password", PropertyValue::Nil) => self.set_password(None),
            ("path", _) => return Err(type_error(name, "a string")),
            ("password", _) => return Err(type_error(name, "a string or nil")),
            ("zoom" | "scroll.x" | "scroll.y", value) => {
                let number = value.as_number().ok_or_else(|| type_error(name, "a number"))?;
                match name {
                    "zoom" => self.set_zoom(number)?,
                    "scroll.x" => self.set_scroll_x(number),
                    _ => self.set_scroll_y(number),
                }
            }
            (name, _) if READ_ONLY.contains(&name) => {
                return Err(ViewerError::ReadOnlyProperty(name.to_owned()))
            }
            (name, _) => warn!(property = name, "ignoring write to unknown property"),
        }
        Ok(())
    }

    fn destroy(&mut self) {
        Document::destroy(self);
    }
}

fn type_error(name: &str, expected: &'static str) -> ViewerError {
    ViewerError::PropertyType {
        name: name.to_owned(),
        expected,
    }
}
