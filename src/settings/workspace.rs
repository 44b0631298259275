//! Persisted workspace record.

use serde::{Deserialize, Serialize};

use crate::settings::background::BackgroundSettingsInitial;
use crate::settings::widget::WidgetSettingsInitial;

/// A workspace as stored under its per-id key.
///
/// Every field is optional so that partial or empty records still load:
/// the background falls back to a static color and the widget list to empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceSettingsInitial {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<BackgroundSettingsInitial>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widgets: Option<Vec<WidgetSettingsInitial>>,
}

impl WorkspaceSettingsInitial {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}
