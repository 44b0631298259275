//! Background settings: the persisted initial form and the live, observable
//! form built from it.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::observable::Observable;
use crate::settings::property::Property;
use crate::tracker::Trackable;

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackgroundKind {
    StaticColor,
    RandomColor,
    StaticImage,
    RandomImage,
    BingDailyImage,
    AnimeImage,
    NasaApod,
    Pexels,
    WikimediaCommonsPod,
}

impl BackgroundKind {
    pub const ALL: [BackgroundKind; 9] = [
        BackgroundKind::StaticColor,
        BackgroundKind::RandomColor,
        BackgroundKind::StaticImage,
        BackgroundKind::RandomImage,
        BackgroundKind::BingDailyImage,
        BackgroundKind::AnimeImage,
        BackgroundKind::NasaApod,
        BackgroundKind::Pexels,
        BackgroundKind::WikimediaCommonsPod,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BackgroundKind::StaticColor => "static-color",
            BackgroundKind::RandomColor => "random-color",
            BackgroundKind::StaticImage => "static-image",
            BackgroundKind::RandomImage => "random-image",
            BackgroundKind::BingDailyImage => "bing-daily-image",
            BackgroundKind::AnimeImage => "anime-image",
            BackgroundKind::NasaApod => "nasa-apod",
            BackgroundKind::Pexels => "pexels",
            BackgroundKind::WikimediaCommonsPod => "wikimedia-commons-pod",
        }
    }
}

impl fmt::Display for BackgroundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackgroundKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::Other(format!("unknown background kind: {s}")))
    }
}

// ---------------------------------------------------------------------------
// Initial (persisted) form
// ---------------------------------------------------------------------------

/// Plain background settings as stored and as used for construction.
///
/// `extra` carries the kind-specific fields; missing fields take their
/// defaults when the live form is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundSettingsInitial {
    #[serde(rename = "type")]
    pub kind: BackgroundKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blur: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimming: Option<u8>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl BackgroundSettingsInitial {
    pub fn new(kind: BackgroundKind) -> Self {
        Self {
            kind,
            blur: None,
            dimming: None,
            extra: Map::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

impl Default for BackgroundSettingsInitial {
    fn default() -> Self {
        Self::new(BackgroundKind::StaticColor)
    }
}

// ---------------------------------------------------------------------------
// Live form
// ---------------------------------------------------------------------------

const MAX_PERCENT: u8 = 100;

/// Live background settings. Every field is observable.
pub struct BackgroundSettings {
    observable: Observable,
    kind: BackgroundKind,
    blur: Property<u8>,
    dimming: Property<u8>,
    extra: BackgroundExtra,
}

impl BackgroundSettings {
    pub fn new(initial: &BackgroundSettingsInitial) -> Result<Self> {
        let blur = percent(initial.kind, "blur", initial.blur.unwrap_or(0))?;
        let dimming = percent(initial.kind, "dimming", initial.dimming.unwrap_or(0))?;
        Ok(Self {
            observable: Observable::new(),
            kind: initial.kind,
            blur: Property::new(blur),
            dimming: Property::new(dimming),
            extra: BackgroundExtra::new(initial.kind, &initial.extra)?,
        })
    }

    pub fn kind(&self) -> BackgroundKind {
        self.kind
    }

    /// Blur percentage. Use [`set_blur`](Self::set_blur) to change it.
    pub fn blur(&self) -> &Property<u8> {
        &self.blur
    }

    pub fn dimming(&self) -> &Property<u8> {
        &self.dimming
    }

    pub fn set_blur(&self, value: u8) -> Result<()> {
        self.blur.set(percent(self.kind, "blur", value)?);
        Ok(())
    }

    pub fn set_dimming(&self, value: u8) -> Result<()> {
        self.dimming.set(percent(self.kind, "dimming", value)?);
        Ok(())
    }

    pub fn extra(&self) -> &BackgroundExtra {
        &self.extra
    }

    pub fn to_initial(&self) -> BackgroundSettingsInitial {
        BackgroundSettingsInitial {
            kind: self.kind,
            blur: Some(self.blur.get()),
            dimming: Some(self.dimming.get()),
            extra: self.extra.to_initial(),
        }
    }

    /// Overwrite every field from `initial`, then notify once.
    ///
    /// Nothing is written unless the whole record validates.
    pub fn apply(&self, initial: &BackgroundSettingsInitial) -> Result<()> {
        if initial.kind != self.kind {
            return Err(Error::construction(
                format!("{} background", self.kind),
                format!("cannot apply {} settings", initial.kind),
            ));
        }
        let staged = Self::new(initial)?;
        self.blur.set(staged.blur.get());
        self.dimming.set(staged.dimming.get());
        self.extra.copy_from(&staged.extra);
        self.observable.notify();
        Ok(())
    }

    /// Restore the defaults for this kind.
    pub fn reset(&self) -> Result<()> {
        self.apply(&BackgroundSettingsInitial::new(self.kind))
    }
}

impl Trackable for BackgroundSettings {
    fn observable(&self) -> &Observable {
        &self.observable
    }

    fn visit_nested(&self, visit: &mut dyn FnMut(&dyn Trackable)) {
        visit(&self.blur);
        visit(&self.dimming);
        visit(&self.extra);
    }
}

impl fmt::Debug for BackgroundSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundSettings")
            .field("kind", &self.kind)
            .field("blur", &self.blur)
            .field("dimming", &self.dimming)
            .finish_non_exhaustive()
    }
}

/// Kind-specific part of the background settings.
pub enum BackgroundExtra {
    Color(ColorSettings),
    RandomColor(RandomColorSettings),
    Image(ImageSettings),
    Feed(FeedSettings),
}

impl BackgroundExtra {
    fn new(kind: BackgroundKind, extra: &Map<String, Value>) -> Result<Self> {
        Ok(match kind {
            BackgroundKind::StaticColor => {
                let initial: ColorInitial = decode(kind, extra)?;
                if !is_hex_color(&initial.color) {
                    return Err(Error::construction(
                        format!("{kind} background"),
                        format!("invalid color {:?}", initial.color),
                    ));
                }
                Self::Color(ColorSettings {
                    observable: Observable::new(),
                    color: Property::new(initial.color),
                })
            }
            BackgroundKind::RandomColor => {
                let initial: RandomColorInitial = decode(kind, extra)?;
                Self::RandomColor(RandomColorSettings {
                    observable: Observable::new(),
                    update_interval: Property::new(interval(kind, initial.update_interval)?),
                })
            }
            BackgroundKind::StaticImage => {
                let initial: ImageInitial = decode(kind, extra)?;
                Self::Image(ImageSettings {
                    observable: Observable::new(),
                    url: Property::new(initial.url),
                })
            }
            BackgroundKind::RandomImage
            | BackgroundKind::BingDailyImage
            | BackgroundKind::AnimeImage
            | BackgroundKind::NasaApod
            | BackgroundKind::Pexels
            | BackgroundKind::WikimediaCommonsPod => {
                let initial: FeedInitial = decode(kind, extra)?;
                Self::Feed(FeedSettings {
                    observable: Observable::new(),
                    kind,
                    update_interval: Property::new(interval(kind, initial.update_interval)?),
                    query: Property::new(initial.query),
                })
            }
        })
    }

    fn to_initial(&self) -> Map<String, Value> {
        let value = match self {
            Self::Color(s) => serde_json::json!({ "color": s.color.get() }),
            Self::RandomColor(s) => {
                serde_json::json!({ "update_interval": s.update_interval.get() })
            }
            Self::Image(s) => serde_json::json!({ "url": s.url.get() }),
            Self::Feed(s) => serde_json::json!({
                "update_interval": s.update_interval.get(),
                "query": s.query.get(),
            }),
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn copy_from(&self, other: &Self) {
        match (self, other) {
            (Self::Color(a), Self::Color(b)) => a.color.set(b.color.get()),
            (Self::RandomColor(a), Self::RandomColor(b)) => {
                a.update_interval.set(b.update_interval.get())
            }
            (Self::Image(a), Self::Image(b)) => a.url.set(b.url.get()),
            (Self::Feed(a), Self::Feed(b)) => {
                a.update_interval.set(b.update_interval.get());
                a.query.set(b.query.get());
            }
            _ => return,
        }
        self.observable().notify();
    }
}

impl Trackable for BackgroundExtra {
    fn observable(&self) -> &Observable {
        match self {
            Self::Color(s) => &s.observable,
            Self::RandomColor(s) => &s.observable,
            Self::Image(s) => &s.observable,
            Self::Feed(s) => &s.observable,
        }
    }

    fn visit_nested(&self, visit: &mut dyn FnMut(&dyn Trackable)) {
        match self {
            Self::Color(s) => visit(&s.color),
            Self::RandomColor(s) => visit(&s.update_interval),
            Self::Image(s) => visit(&s.url),
            Self::Feed(s) => {
                visit(&s.update_interval);
                visit(&s.query);
            }
        }
    }
}

/// `static-color`
pub struct ColorSettings {
    observable: Observable,
    color: Property<String>,
}

impl ColorSettings {
    pub fn color(&self) -> &Property<String> {
        &self.color
    }

    /// Accepts `#rgb` or `#rrggbb`.
    pub fn set_color(&self, color: impl Into<String>) -> Result<()> {
        let color = color.into();
        if !is_hex_color(&color) {
            return Err(Error::construction(
                format!("{} background", BackgroundKind::StaticColor),
                format!("invalid color {color:?}"),
            ));
        }
        self.color.set(color);
        Ok(())
    }
}

/// `random-color`
pub struct RandomColorSettings {
    observable: Observable,
    /// Seconds between color changes.
    update_interval: Property<u64>,
}

impl RandomColorSettings {
    pub fn update_interval(&self) -> &Property<u64> {
        &self.update_interval
    }

    pub fn set_update_interval(&self, seconds: u64) -> Result<()> {
        self.update_interval
            .set(interval(BackgroundKind::RandomColor, seconds)?);
        Ok(())
    }
}

/// `static-image`
pub struct ImageSettings {
    observable: Observable,
    pub url: Property<String>,
}

/// Remote image feeds (`random-image`, `bing-daily-image`, `nasa-apod`, ...).
pub struct FeedSettings {
    observable: Observable,
    kind: BackgroundKind,
    /// Seconds between image refreshes.
    update_interval: Property<u64>,
    /// Search topic, where the provider supports one.
    pub query: Property<String>,
}

impl FeedSettings {
    pub fn update_interval(&self) -> &Property<u64> {
        &self.update_interval
    }

    pub fn set_update_interval(&self, seconds: u64) -> Result<()> {
        self.update_interval.set(interval(self.kind, seconds)?);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Kind-specific initial records
// ---------------------------------------------------------------------------

const DEFAULT_COLOR: &str = "#1e1e2e";
const DEFAULT_UPDATE_INTERVAL: u64 = 60 * 60;

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_update_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL
}

#[derive(Deserialize)]
struct ColorInitial {
    #[serde(default = "default_color")]
    color: String,
}

#[derive(Deserialize)]
struct RandomColorInitial {
    #[serde(default = "default_update_interval")]
    update_interval: u64,
}

#[derive(Deserialize)]
struct ImageInitial {
    #[serde(default)]
    url: String,
}

#[derive(Deserialize)]
struct FeedInitial {
    #[serde(default = "default_update_interval")]
    update_interval: u64,
    #[serde(default)]
    query: String,
}

fn decode<T: DeserializeOwned>(kind: BackgroundKind, extra: &Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(extra.clone()))
        .map_err(|e| Error::construction(format!("{kind} background"), e.to_string()))
}

fn percent(kind: BackgroundKind, field: &str, value: u8) -> Result<u8> {
    if value > MAX_PERCENT {
        return Err(Error::construction(
            format!("{kind} background"),
            format!("{field} must be at most {MAX_PERCENT}, got {value}"),
        ));
    }
    Ok(value)
}

fn interval(kind: BackgroundKind, seconds: u64) -> Result<u64> {
    if seconds == 0 {
        return Err(Error::construction(
            format!("{kind} background"),
            "update_interval must be positive",
        ));
    }
    Ok(seconds)
}

/// `#rgb` or `#rrggbb`.
pub(crate) fn is_hex_color(s: &str) -> bool {
    s.strip_prefix('#').is_some_and(|hex| {
        matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
    })
}
