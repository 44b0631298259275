//! Workspace aggregate: one background plus a set of widgets, tracked as a
//! single unit of unsaved changes.
//!
//! Every live settings object reachable from the workspace is subscribed
//! through one [`ChangeTracker`]. Any emission marks the workspace dirty;
//! observers of the workspace hear about the clean-to-dirty edge only, so a
//! burst of edits produces one notification. Structural edits (adding,
//! removing, or replacing members) always notify. The flag is cleared only
//! by a successful [`Workspace::commit`].

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, Weak};

use futures::future::try_join_all;
use tracing::{Instrument, debug, warn};

use crate::catalog::Catalogs;
use crate::error::{Error, Result};
use crate::instance::{BackgroundInstance, WidgetInstance};
use crate::observable::{Observable, Subscription};
use crate::settings::{
    BackgroundSettingsInitial, Property, WidgetSettingsInitial, WorkspaceSettingsInitial,
};
use crate::telemetry::{metrics, workspace::start_commit_span};
use crate::tracker::ChangeTracker;

#[derive(Default)]
struct DirtyFlags {
    has_changes: bool,
    /// Bumped on every change, so a commit can tell whether edits landed
    /// while its persist handler was running.
    revision: u64,
}

struct DirtyState {
    observable: Observable,
    flags: Mutex<DirtyFlags>,
}

impl DirtyState {
    fn new() -> Self {
        Self {
            observable: Observable::new(),
            flags: Mutex::new(DirtyFlags::default()),
        }
    }

    fn flags(&self) -> std::sync::MutexGuard<'_, DirtyFlags> {
        self.flags.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns true on the clean-to-dirty transition.
    fn mark(&self) -> bool {
        let mut flags = self.flags();
        flags.revision += 1;
        !std::mem::replace(&mut flags.has_changes, true)
    }

    fn on_tracked_change(&self) {
        if self.mark() {
            self.observable.notify();
        }
    }

    fn revision(&self) -> u64 {
        self.flags().revision
    }

    /// Clear the flag unless something changed after `revision`.
    /// Returns true if the flag went from dirty to clean.
    fn clear_at(&self, revision: u64) -> bool {
        let mut flags = self.flags();
        if flags.revision != revision {
            return false;
        }
        std::mem::replace(&mut flags.has_changes, false)
    }
}

pub struct Workspace {
    catalogs: Arc<Catalogs>,
    dirty: Arc<DirtyState>,
    tracker: ChangeTracker,
    name: Property<String>,
    background: Arc<BackgroundInstance>,
    widgets: Vec<Arc<WidgetInstance>>,
    locked: bool,
}

impl Workspace {
    /// Build a workspace from a stored or fresh record.
    ///
    /// The background and all widgets are constructed concurrently; widgets
    /// keep the order of `initial.widgets`. If any construction fails the
    /// whole call fails and nothing is returned.
    pub async fn create(catalogs: Arc<Catalogs>, initial: WorkspaceSettingsInitial) -> Result<Self> {
        let WorkspaceSettingsInitial {
            name,
            background,
            widgets,
        } = initial;

        let background =
            BackgroundInstance::create(&catalogs.backgrounds, background.unwrap_or_default());
        let widgets = try_join_all(
            widgets
                .unwrap_or_default()
                .into_iter()
                .map(|settings| WidgetInstance::create(&catalogs.widgets, settings)),
        );
        let (background, widgets) = futures::try_join!(background, widgets)?;

        let workspace = Self::assemble(
            Arc::clone(&catalogs),
            name.unwrap_or_default(),
            background,
            widgets,
        );
        debug!(
            name = %workspace.name.get(),
            background = %workspace.background.kind(),
            widgets = workspace.widgets.len(),
            "workspace created"
        );
        Ok(workspace)
    }

    fn assemble(
        catalogs: Arc<Catalogs>,
        name: String,
        background: BackgroundInstance,
        widgets: Vec<WidgetInstance>,
    ) -> Self {
        let dirty = Arc::new(DirtyState::new());
        let weak: Weak<DirtyState> = Arc::downgrade(&dirty);
        let tracker = ChangeTracker::new(move || {
            if let Some(dirty) = weak.upgrade() {
                dirty.on_tracked_change();
            }
        });

        let mut workspace = Self {
            catalogs,
            dirty,
            tracker,
            name: Property::new(name),
            background: Arc::new(background),
            widgets: widgets.into_iter().map(Arc::new).collect(),
            locked: false,
        };
        workspace.tracker.track(&workspace.name);
        workspace.tracker.track(workspace.background.settings());
        for widget in &workspace.widgets {
            workspace.tracker.track(widget.settings());
        }
        workspace
    }

    /// Display name. Renaming marks the workspace dirty.
    pub fn name(&self) -> &Property<String> {
        &self.name
    }

    pub fn background(&self) -> &Arc<BackgroundInstance> {
        &self.background
    }

    /// Widgets in insertion order.
    pub fn widgets(&self) -> &[Arc<WidgetInstance>] {
        &self.widgets
    }

    pub fn has_changes(&self) -> bool {
        self.dirty.flags().has_changes
    }

    /// Advisory only; the workspace does not refuse edits while locked.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Listen for changes to the workspace as a whole.
    pub fn subscribe(&self, on_change: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.dirty.observable.subscribe(on_change)
    }

    /// Number of observables currently subscribed by this workspace.
    pub fn tracked_observables(&self) -> usize {
        self.tracker.len()
    }

    /// Replace the background.
    ///
    /// The new background is built first; if that fails the current one is
    /// left in place and still tracked.
    pub async fn set_background(&mut self, initial: BackgroundSettingsInitial) -> Result<()> {
        let next = BackgroundInstance::create(&self.catalogs.backgrounds, initial).await?;

        self.tracker.untrack(self.background.settings());
        let previous = std::mem::replace(&mut self.background, Arc::new(next));
        self.tracker.track(self.background.settings());
        debug!(from = %previous.kind(), to = %self.background.kind(), "background replaced");

        self.structural_change();
        Ok(())
    }

    pub async fn add_widget(&mut self, initial: WidgetSettingsInitial) -> Result<Arc<WidgetInstance>> {
        let widget = Arc::new(WidgetInstance::create(&self.catalogs.widgets, initial).await?);
        self.insert_widget(Arc::clone(&widget));
        Ok(widget)
    }

    /// Take ownership of an already constructed widget.
    ///
    /// Returns false if this exact instance is already a member.
    pub fn insert_widget(&mut self, widget: Arc<WidgetInstance>) -> bool {
        if self.contains(&widget) {
            return false;
        }
        self.tracker.track(widget.settings());
        debug!(kind = %widget.kind(), "widget added");
        self.widgets.push(widget);
        self.structural_change();
        true
    }

    /// Remove `widget` if it is a member. Returns false, and changes nothing,
    /// otherwise.
    pub fn remove_widget(&mut self, widget: &Arc<WidgetInstance>) -> bool {
        let Some(position) = self.widgets.iter().position(|w| Arc::ptr_eq(w, widget)) else {
            return false;
        };
        let removed = self.widgets.remove(position);
        self.tracker.untrack(removed.settings());
        debug!(kind = %removed.kind(), "widget removed");
        self.structural_change();
        true
    }

    pub fn contains(&self, widget: &Arc<WidgetInstance>) -> bool {
        self.widgets.iter().any(|w| Arc::ptr_eq(w, widget))
    }

    /// Plain record of the current state.
    pub fn snapshot(&self) -> WorkspaceSettingsInitial {
        WorkspaceSettingsInitial {
            name: Some(self.name.get()),
            background: Some(self.background.settings().to_initial()),
            widgets: Some(
                self.widgets
                    .iter()
                    .map(|widget| widget.settings().to_initial())
                    .collect(),
            ),
        }
    }

    /// Hand a snapshot to `persist`; clear the dirty flag once it succeeds.
    ///
    /// On failure the flag stays set and the error is returned as
    /// [`Error::Persist`]. Changes made while `persist` runs keep the
    /// workspace dirty.
    pub async fn commit<F, Fut>(&self, persist: F) -> Result<()>
    where
        F: FnOnce(WorkspaceSettingsInitial) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let span = start_commit_span(&self.name.get(), self.widgets.len());
        async {
            let revision = self.dirty.revision();
            let record = self.snapshot();

            if let Err(e) = persist(record).await {
                metrics::record_commit(false);
                warn!("workspace commit failed: {e}");
                return Err(Error::Persist(Box::new(e)));
            }
            metrics::record_commit(true);

            if self.dirty.clear_at(revision) {
                self.dirty.observable.notify();
            } else if self.has_changes() {
                debug!("workspace changed during commit, staying dirty");
            }
            Ok(())
        }
        .instrument(span)
        .await
    }

    fn structural_change(&self) {
        self.dirty.mark();
        self.dirty.observable.notify();
    }
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("name", &self.name.get())
            .field("background", &self.background)
            .field("widgets", &self.widgets)
            .field("has_changes", &self.has_changes())
            .field("locked", &self.locked)
            .finish()
    }
}
