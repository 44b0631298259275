//! Widget settings.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::observable::Observable;
use crate::settings::property::Property;
use crate::tracker::Trackable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetKind {
    Clock,
    Date,
    Note,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 3] = [WidgetKind::Clock, WidgetKind::Date, WidgetKind::Note];

    pub fn as_str(self) -> &'static str {
        match self {
            WidgetKind::Clock => "clock",
            WidgetKind::Date => "date",
            WidgetKind::Note => "note",
        }
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WidgetKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::Other(format!("unknown widget kind: {s}")))
    }
}

/// Placement of a widget on the dashboard grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetPosition {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Default for WidgetPosition {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: 4,
            height: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetSettingsInitial {
    #[serde(rename = "type")]
    pub kind: WidgetKind,
    #[serde(default)]
    pub position: WidgetPosition,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl WidgetSettingsInitial {
    pub fn new(kind: WidgetKind) -> Self {
        Self {
            kind,
            position: WidgetPosition::default(),
            extra: Map::new(),
        }
    }

    pub fn at(mut self, position: WidgetPosition) -> Self {
        self.position = position;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Live widget settings.
pub struct WidgetSettings {
    observable: Observable,
    kind: WidgetKind,
    position: PositionSettings,
    extra: WidgetExtra,
}

impl WidgetSettings {
    pub fn new(initial: &WidgetSettingsInitial) -> Result<Self> {
        Ok(Self {
            observable: Observable::new(),
            kind: initial.kind,
            position: PositionSettings::new(initial.kind, initial.position)?,
            extra: WidgetExtra::new(initial.kind, &initial.extra)?,
        })
    }

    pub fn kind(&self) -> WidgetKind {
        self.kind
    }

    pub fn position(&self) -> &PositionSettings {
        &self.position
    }

    pub fn extra(&self) -> &WidgetExtra {
        &self.extra
    }

    pub fn to_initial(&self) -> WidgetSettingsInitial {
        WidgetSettingsInitial {
            kind: self.kind,
            position: self.position.get(),
            extra: self.extra.to_initial(),
        }
    }

    /// Restore the default position and kind-specific values, then notify.
    pub fn reset(&self) {
        let defaults = WidgetPosition::default();
        self.position.move_to(defaults.x, defaults.y);
        self.position.width.set(defaults.width);
        self.position.height.set(defaults.height);
        match &self.extra {
            WidgetExtra::TimeFormat(s) => s.format.set(default_format(self.kind).to_string()),
            WidgetExtra::Note(s) => s.text.set(String::new()),
        }
        self.observable.notify();
    }
}

impl Trackable for WidgetSettings {
    fn observable(&self) -> &Observable {
        &self.observable
    }

    fn visit_nested(&self, visit: &mut dyn FnMut(&dyn Trackable)) {
        visit(&self.position);
        visit(&self.extra);
    }
}

impl fmt::Debug for WidgetSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetSettings")
            .field("kind", &self.kind)
            .field("position", &self.position.get())
            .finish_non_exhaustive()
    }
}

pub struct PositionSettings {
    observable: Observable,
    pub x: Property<i32>,
    pub y: Property<i32>,
    width: Property<u32>,
    height: Property<u32>,
}

impl PositionSettings {
    fn new(kind: WidgetKind, position: WidgetPosition) -> Result<Self> {
        check_size(kind, position.width, position.height)?;
        Ok(Self {
            observable: Observable::new(),
            x: Property::new(position.x),
            y: Property::new(position.y),
            width: Property::new(position.width),
            height: Property::new(position.height),
        })
    }

    pub fn get(&self) -> WidgetPosition {
        WidgetPosition {
            x: self.x.get(),
            y: self.y.get(),
            width: self.width.get(),
            height: self.height.get(),
        }
    }

    pub fn move_to(&self, x: i32, y: i32) {
        self.x.set(x);
        self.y.set(y);
    }

    /// Both dimensions must be non-zero.
    pub fn resize(&self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::Other(format!(
                "widget size must be non-zero, got {width}x{height}"
            )));
        }
        self.width.set(width);
        self.height.set(height);
        Ok(())
    }
}

impl Trackable for PositionSettings {
    fn observable(&self) -> &Observable {
        &self.observable
    }

    fn visit_nested(&self, visit: &mut dyn FnMut(&dyn Trackable)) {
        visit(&self.x);
        visit(&self.y);
        visit(&self.width);
        visit(&self.height);
    }
}

pub enum WidgetExtra {
    /// `clock` and `date`
    TimeFormat(TimeFormatSettings),
    Note(NoteSettings),
}

impl WidgetExtra {
    fn new(kind: WidgetKind, extra: &Map<String, Value>) -> Result<Self> {
        Ok(match kind {
            WidgetKind::Clock | WidgetKind::Date => {
                let initial: TimeFormatInitial = decode(kind, extra)?;
                let format = initial.format.unwrap_or_else(|| default_format(kind).to_string());
                if !is_valid_format(&format) {
                    return Err(Error::construction(
                        format!("{kind} widget"),
                        format!("invalid time format {format:?}"),
                    ));
                }
                Self::TimeFormat(TimeFormatSettings {
                    observable: Observable::new(),
                    kind,
                    format: Property::new(format),
                })
            }
            WidgetKind::Note => {
                let initial: NoteInitial = decode(kind, extra)?;
                Self::Note(NoteSettings {
                    observable: Observable::new(),
                    text: Property::new(initial.text),
                })
            }
        })
    }

    fn to_initial(&self) -> Map<String, Value> {
        let mut map = Map::new();
        match self {
            Self::TimeFormat(s) => {
                map.insert("format".to_string(), Value::String(s.format.get()));
            }
            Self::Note(s) => {
                map.insert("text".to_string(), Value::String(s.text.get()));
            }
        }
        map
    }
}

impl Trackable for WidgetExtra {
    fn observable(&self) -> &Observable {
        match self {
            Self::TimeFormat(s) => &s.observable,
            Self::Note(s) => &s.observable,
        }
    }

    fn visit_nested(&self, visit: &mut dyn FnMut(&dyn Trackable)) {
        match self {
            Self::TimeFormat(s) => visit(&s.format),
            Self::Note(s) => visit(&s.text),
        }
    }
}

pub struct TimeFormatSettings {
    observable: Observable,
    kind: WidgetKind,
    /// strftime-style pattern.
    format: Property<String>,
}

impl TimeFormatSettings {
    pub fn format(&self) -> &Property<String> {
        &self.format
    }

    /// Replace the pattern. Patterns chrono cannot parse are refused.
    pub fn set_format(&self, format: impl Into<String>) -> Result<()> {
        let format = format.into();
        if !is_valid_format(&format) {
            return Err(Error::construction(
                format!("{} widget", self.kind),
                format!("invalid time format {format:?}"),
            ));
        }
        self.format.set(format);
        Ok(())
    }

    /// `None` if the current format is not a valid pattern.
    pub fn render<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> Option<String>
    where
        Tz::Offset: fmt::Display,
    {
        let format = self.format.get();
        let mut out = String::new();
        write!(out, "{}", at.format(&format)).ok()?;
        Some(out)
    }
}

pub struct NoteSettings {
    observable: Observable,
    pub text: Property<String>,
}

#[derive(Deserialize)]
struct TimeFormatInitial {
    #[serde(default)]
    format: Option<String>,
}

#[derive(Deserialize)]
struct NoteInitial {
    #[serde(default)]
    text: String,
}

fn default_format(kind: WidgetKind) -> &'static str {
    match kind {
        WidgetKind::Date => "%A, %e %B",
        _ => "%H:%M",
    }
}

fn is_valid_format(format: &str) -> bool {
    !format.is_empty() && !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

fn check_size(kind: WidgetKind, width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::construction(
            format!("{kind} widget"),
            format!("size must be non-zero, got {width}x{height}"),
        ));
    }
    Ok(())
}

fn decode<T: DeserializeOwned>(kind: WidgetKind, extra: &Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(extra.clone()))
        .map_err(|e| Error::construction(format!("{kind} widget"), e.to_string()))
}
