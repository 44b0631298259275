//! Settings objects in their two forms.
//!
//! *Initial* settings are plain serde records used for construction and
//! persistence. *Live* settings are built from them, are observable at every
//! level, and declare their nested observables through [`Trackable`].
//!
//! [`Trackable`]: crate::tracker::Trackable

pub mod background;
pub mod property;
pub mod widget;
pub mod workspace;

pub use background::{BackgroundKind, BackgroundSettings, BackgroundSettingsInitial};
pub use property::Property;
pub use widget::{WidgetKind, WidgetPosition, WidgetSettings, WidgetSettingsInitial};
pub use workspace::WorkspaceSettingsInitial;
