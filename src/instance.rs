//! Runtime wrappers pairing a kind with its live settings.

use std::fmt;

use crate::catalog::{BackgroundCatalog, WidgetCatalog};
use crate::error::Result;
use crate::settings::{
    BackgroundKind, BackgroundSettings, BackgroundSettingsInitial, WidgetKind, WidgetSettings,
    WidgetSettingsInitial,
};
use crate::telemetry::metrics;

pub struct BackgroundInstance {
    settings: BackgroundSettings,
}

impl BackgroundInstance {
    /// Build the live settings through the catalog entry for `initial.kind`.
    pub async fn create(
        catalog: &BackgroundCatalog,
        initial: BackgroundSettingsInitial,
    ) -> Result<Self> {
        let kind = initial.kind;
        let result = match catalog.entry(kind) {
            Ok(entry) => entry.construct(initial).await,
            Err(e) => Err(e),
        };
        metrics::record_construction("background", kind.as_str(), result.is_ok());
        Ok(Self { settings: result? })
    }

    pub fn kind(&self) -> BackgroundKind {
        self.settings.kind()
    }

    pub fn settings(&self) -> &BackgroundSettings {
        &self.settings
    }
}

impl fmt::Debug for BackgroundInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundInstance")
            .field("settings", &self.settings)
            .finish()
    }
}

/// A widget on a workspace. Identity is the instance itself: two widgets with
/// equal settings are still distinct members.
pub struct WidgetInstance {
    settings: WidgetSettings,
}

impl WidgetInstance {
    pub async fn create(catalog: &WidgetCatalog, initial: WidgetSettingsInitial) -> Result<Self> {
        let kind = initial.kind;
        let result = match catalog.entry(kind) {
            Ok(entry) => entry.construct(initial).await,
            Err(e) => Err(e),
        };
        metrics::record_construction("widget", kind.as_str(), result.is_ok());
        Ok(Self { settings: result? })
    }

    pub fn kind(&self) -> WidgetKind {
        self.settings.kind()
    }

    pub fn settings(&self) -> &WidgetSettings {
        &self.settings
    }
}

impl fmt::Debug for WidgetInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetInstance")
            .field("settings", &self.settings)
            .finish()
    }
}
