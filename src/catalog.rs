//! Catalog of background and widget kinds.
//!
//! Each entry carries a display name, default initial settings, and a lazily
//! resolved settings-model constructor. Kinds are a closed set; the catalog
//! maps each kind to its entry.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use crate::error::{Error, Result};
use crate::lazy::Lazy;
use crate::settings::{
    BackgroundKind, BackgroundSettings, BackgroundSettingsInitial, WidgetKind, WidgetSettings,
    WidgetSettingsInitial,
};

/// Builds live settings `L` from initial settings `I`.
pub type ModelFn<I, L> = Arc<dyn Fn(I) -> BoxFuture<'static, Result<L>> + Send + Sync>;

pub struct CatalogEntry<I, L> {
    name: String,
    defaults: I,
    model: Lazy<ModelFn<I, L>>,
}

impl<I, L> CatalogEntry<I, L>
where
    I: Clone + Send + 'static,
    L: 'static,
{
    /// `load` runs at most once, the first time an instance of this kind is
    /// constructed.
    pub fn new<F, Fut>(name: impl Into<String>, defaults: I, load: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ModelFn<I, L>>> + Send + 'static,
    {
        Self {
            name: name.into(),
            defaults,
            model: Lazy::new(load),
        }
    }

    /// Entry whose model is a plain async constructor.
    pub fn with_model<F, Fut>(name: impl Into<String>, defaults: I, build: F) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<L>> + Send + 'static,
    {
        let model: ModelFn<I, L> =
            Arc::new(move |initial: I| -> BoxFuture<'static, Result<L>> {
                Box::pin(build(initial))
            });
        let name = name.into();
        let label = name.clone();
        Self::new(name, defaults, move || {
            let model = Arc::clone(&model);
            let label = label.clone();
            async move {
                debug!(entry = %label, "settings model resolved");
                Ok(model)
            }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn defaults(&self) -> &I {
        &self.defaults
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_resolved()
    }

    /// Resolve the model if needed and build live settings from `initial`.
    pub async fn construct(&self, initial: I) -> Result<L> {
        let model = self.model.resolve().await?;
        model(initial).await
    }
}

impl<I: fmt::Debug, L> fmt::Debug for CatalogEntry<I, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("name", &self.name)
            .field("defaults", &self.defaults)
            .field("loaded", &self.model.is_resolved())
            .finish()
    }
}

/// Ordered mapping from kind to entry.
pub struct Catalog<K, I, L> {
    entries: Vec<(K, CatalogEntry<I, L>)>,
}

impl<K, I, L> Catalog<K, I, L>
where
    K: Copy + PartialEq + fmt::Display,
{
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add an entry, replacing any existing entry for `kind` in place.
    pub fn register(mut self, kind: K, entry: CatalogEntry<I, L>) -> Self {
        match self.entries.iter_mut().find(|(k, _)| *k == kind) {
            Some(slot) => slot.1 = entry,
            None => self.entries.push((kind, entry)),
        }
        self
    }

    pub fn get(&self, kind: K) -> Option<&CatalogEntry<I, L>> {
        self.entries
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, entry)| entry)
    }

    /// Like [`get`](Self::get), but a missing kind is a construction error.
    pub fn entry(&self, kind: K) -> Result<&CatalogEntry<I, L>> {
        self.get(kind)
            .ok_or_else(|| Error::construction(kind.to_string(), "no catalog entry for this kind"))
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &CatalogEntry<I, L>)> {
        self.entries.iter().map(|(k, entry)| (*k, entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, I, L> Default for Catalog<K, I, L>
where
    K: Copy + PartialEq + fmt::Display,
{
    fn default() -> Self {
        Self::new()
    }
}

pub type BackgroundCatalog = Catalog<BackgroundKind, BackgroundSettingsInitial, BackgroundSettings>;
pub type WidgetCatalog = Catalog<WidgetKind, WidgetSettingsInitial, WidgetSettings>;

/// Both catalogs, shared by every workspace built from them.
pub struct Catalogs {
    pub backgrounds: BackgroundCatalog,
    pub widgets: WidgetCatalog,
}

impl Catalogs {
    /// Every built-in kind with its validating settings model.
    pub fn builtin() -> Self {
        Self {
            backgrounds: builtin_backgrounds(),
            widgets: builtin_widgets(),
        }
    }
}

impl Default for Catalogs {
    fn default() -> Self {
        Self::builtin()
    }
}

fn background_name(kind: BackgroundKind) -> &'static str {
    match kind {
        BackgroundKind::StaticColor => "Static color",
        BackgroundKind::RandomColor => "Random color",
        BackgroundKind::StaticImage => "Static image",
        BackgroundKind::RandomImage => "Random image",
        BackgroundKind::BingDailyImage => "Bing daily image",
        BackgroundKind::AnimeImage => "Anime image",
        BackgroundKind::NasaApod => "NASA astronomy picture of the day",
        BackgroundKind::Pexels => "Pexels",
        BackgroundKind::WikimediaCommonsPod => "Wikimedia Commons picture of the day",
    }
}

fn widget_name(kind: WidgetKind) -> &'static str {
    match kind {
        WidgetKind::Clock => "Clock",
        WidgetKind::Date => "Date",
        WidgetKind::Note => "Note",
    }
}

pub fn builtin_backgrounds() -> BackgroundCatalog {
    BackgroundKind::ALL
        .into_iter()
        .fold(Catalog::new(), |catalog, kind| {
            catalog.register(
                kind,
                CatalogEntry::with_model(
                    background_name(kind),
                    BackgroundSettingsInitial::new(kind),
                    |initial: BackgroundSettingsInitial| async move {
                        BackgroundSettings::new(&initial)
                    },
                ),
            )
        })
}

pub fn builtin_widgets() -> WidgetCatalog {
    WidgetKind::ALL
        .into_iter()
        .fold(Catalog::new(), |catalog, kind| {
            catalog.register(
                kind,
                CatalogEntry::with_model(
                    widget_name(kind),
                    WidgetSettingsInitial::new(kind),
                    |initial: WidgetSettingsInitial| async move { WidgetSettings::new(&initial) },
                ),
            )
        })
}
