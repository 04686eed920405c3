//! Construction options and runtime settings.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RipplesError;

pub const DEFAULT_RESOLUTION: u32 = 256;
pub const MAX_RESOLUTION: u32 = 4096;
pub const DEFAULT_DROP_RADIUS: f64 = 20.0;
pub const DEFAULT_PERTURBANCE: f64 = 0.03;

/// Sub-rectangle of the element, in percent of its client box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContentBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ContentBounds {
    pub fn validate(&self) -> Result<(), String> {
        let all_finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err("contentBounds values must be finite".into());
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err("contentBounds width and height must be positive".into());
        }
        Ok(())
    }
}

/// Options accepted at construction. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RipplesConfig {
    pub image_url: Option<String>,
    pub resolution: u32,
    pub drop_radius: f64,
    pub perturbance: f64,
    pub interactive: bool,
    pub cross_origin: String,
    pub content_bounds: Option<ContentBounds>,
}

impl Default for RipplesConfig {
    fn default() -> Self {
        Self {
            image_url: None,
            resolution: DEFAULT_RESOLUTION,
            drop_radius: DEFAULT_DROP_RADIUS,
            perturbance: DEFAULT_PERTURBANCE,
            interactive: true,
            cross_origin: String::new(),
            content_bounds: None,
        }
    }
}

impl RipplesConfig {
    pub fn from_json(json: &str) -> Result<Self, RipplesError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| RipplesError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RipplesError> {
        if self.resolution == 0 || self.resolution > MAX_RESOLUTION {
            return Err(RipplesError::InvalidConfig(format!(
                "resolution must be in 1..={MAX_RESOLUTION}, got {}",
                self.resolution
            )));
        }
        validate_drop_radius(self.drop_radius).map_err(RipplesError::InvalidConfig)?;
        validate_perturbance(self.perturbance).map_err(RipplesError::InvalidConfig)?;
        if let Some(bounds) = &self.content_bounds {
            bounds.validate().map_err(RipplesError::InvalidConfig)?;
        }
        Ok(())
    }

    /// Splits off the construction-only resolution.
    pub fn into_parts(self) -> (u32, Settings) {
        let settings = Settings {
            image_url: self.image_url,
            drop_radius: self.drop_radius,
            perturbance: self.perturbance,
            interactive: self.interactive,
            cross_origin: self.cross_origin,
            content_bounds: self.content_bounds,
        };
        (self.resolution, settings)
    }
}

/// Options that may change after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub image_url: Option<String>,
    pub drop_radius: f64,
    pub perturbance: f64,
    pub interactive: bool,
    pub cross_origin: String,
    pub content_bounds: Option<ContentBounds>,
}

impl Default for Settings {
    fn default() -> Self {
        RipplesConfig::default().into_parts().1
    }
}

impl Settings {
    pub fn apply(&mut self, setting: Setting) {
        match setting {
            Setting::DropRadius(v) => self.drop_radius = v,
            Setting::Perturbance(v) => self.perturbance = v,
            Setting::Interactive(v) => self.interactive = v,
            Setting::CrossOrigin(v) => self.cross_origin = v,
            Setting::ImageUrl(v) => self.image_url = v,
            Setting::ContentBounds(v) => self.content_bounds = v,
        }
    }
}

/// A single runtime change. Resolution is fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Setting {
    DropRadius(f64),
    Perturbance(f64),
    Interactive(bool),
    CrossOrigin(String),
    ImageUrl(Option<String>),
    ContentBounds(Option<ContentBounds>),
}

impl Setting {
    /// Builds a setting from a property name and a JSON value.
    pub fn parse(property: &str, value: &Value) -> Result<Self, SettingError> {
        let invalid = |reason: &str| SettingError::InvalidValue {
            property: property.to_string(),
            reason: reason.to_string(),
        };
        match property {
            "dropRadius" => {
                let v = value.as_f64().ok_or_else(|| invalid("expected a number"))?;
                validate_drop_radius(v).map_err(|r| invalid(&r))?;
                Ok(Setting::DropRadius(v))
            }
            "perturbance" => {
                let v = value.as_f64().ok_or_else(|| invalid("expected a number"))?;
                validate_perturbance(v).map_err(|r| invalid(&r))?;
                Ok(Setting::Perturbance(v))
            }
            "interactive" => value
                .as_bool()
                .map(Setting::Interactive)
                .ok_or_else(|| invalid("expected a boolean")),
            "crossOrigin" => match value {
                Value::Null => Ok(Setting::CrossOrigin(String::new())),
                Value::String(s) => Ok(Setting::CrossOrigin(s.clone())),
                _ => Err(invalid("expected a string")),
            },
            "imageUrl" => match value {
                Value::Null => Ok(Setting::ImageUrl(None)),
                Value::String(s) if s.is_empty() => Ok(Setting::ImageUrl(None)),
                Value::String(s) => Ok(Setting::ImageUrl(Some(s.clone()))),
                _ => Err(invalid("expected a string or null")),
            },
            "contentBounds" => {
                if value.is_null() {
                    return Ok(Setting::ContentBounds(None));
                }
                let bounds: ContentBounds =
                    serde_json::from_value(value.clone()).map_err(|e| invalid(&e.to_string()))?;
                bounds.validate().map_err(|r| invalid(&r))?;
                Ok(Setting::ContentBounds(Some(bounds)))
            }
            "resolution" => Err(SettingError::UnsupportedRuntimeChange("resolution")),
            other => Err(SettingError::UnknownProperty(other.to_string())),
        }
    }

    pub fn property(&self) -> &'static str {
        match self {
            Setting::DropRadius(_) => "dropRadius",
            Setting::Perturbance(_) => "perturbance",
            Setting::Interactive(_) => "interactive",
            Setting::CrossOrigin(_) => "crossOrigin",
            Setting::ImageUrl(_) => "imageUrl",
            Setting::ContentBounds(_) => "contentBounds",
        }
    }
}

/// Why a runtime change was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingError {
    UnsupportedRuntimeChange(&'static str),
    UnknownProperty(String),
    InvalidValue { property: String, reason: String },
}

impl fmt::Display for SettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedRuntimeChange(property) => {
                write!(f, "`{property}` cannot be changed after construction")
            }
            Self::UnknownProperty(property) => write!(f, "unknown property `{property}`"),
            Self::InvalidValue { property, reason } => {
                write!(f, "invalid value for `{property}`: {reason}")
            }
        }
    }
}

impl std::error::Error for SettingError {}

fn validate_drop_radius(v: f64) -> Result<(), String> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(format!("dropRadius must be a positive number, got {v}"))
    }
}

fn validate_perturbance(v: f64) -> Result<(), String> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(format!("perturbance must be finite, got {v}"))
    }
}
