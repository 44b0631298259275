use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tabdeck::catalog::{CatalogEntry, Catalogs, builtin_backgrounds, builtin_widgets};
use tabdeck::error::Error;
use tabdeck::settings::background::BackgroundExtra;
use tabdeck::settings::widget::WidgetExtra;
use tabdeck::settings::{
    BackgroundKind, BackgroundSettingsInitial, WidgetKind, WidgetPosition, WidgetSettings,
    WidgetSettingsInitial, WorkspaceSettingsInitial,
};
use tabdeck::workspace::Workspace;

fn builtin() -> Arc<Catalogs> {
    Arc::new(Catalogs::builtin())
}

/// Notes whose text names a delay: "A" is slowest, "C" finishes first.
/// Text "fail" refuses to construct.
fn staggered_catalogs() -> Arc<Catalogs> {
    let widgets = builtin_widgets().register(
        WidgetKind::Note,
        CatalogEntry::with_model(
            "Staggered note",
            WidgetSettingsInitial::new(WidgetKind::Note),
            |initial: WidgetSettingsInitial| async move {
                let delay = match initial.extra.get("text").and_then(|t| t.as_str()) {
                    Some("A") => 40,
                    Some("B") => 20,
                    Some("fail") => {
                        return Err(Error::Construction {
                            what: "note widget".to_string(),
                            reason: "refused".to_string(),
                        });
                    }
                    _ => 0,
                };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                WidgetSettings::new(&initial)
            },
        ),
    );
    Arc::new(Catalogs {
        backgrounds: builtin_backgrounds(),
        widgets,
    })
}

fn note(text: &str) -> WidgetSettingsInitial {
    WidgetSettingsInitial::new(WidgetKind::Note).with_extra("text", text)
}

fn note_text(workspace: &Workspace, index: usize) -> String {
    match workspace.widgets()[index].settings().extra() {
        WidgetExtra::Note(s) => s.text.get(),
        WidgetExtra::TimeFormat(_) => panic!("widget {index} is not a note"),
    }
}

fn counter(workspace: &Workspace) -> (Arc<AtomicUsize>, tabdeck::observable::Subscription) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    let subscription = workspace.subscribe(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    (count, subscription)
}

#[tokio::test]
async fn empty_record_defaults_to_static_color_without_widgets() {
    let workspace = Workspace::create(builtin(), WorkspaceSettingsInitial::default())
        .await
        .unwrap();

    assert_eq!(workspace.background().kind(), BackgroundKind::StaticColor);
    assert!(workspace.widgets().is_empty());
    assert!(!workspace.has_changes());
    assert!(!workspace.is_locked());
}

#[tokio::test]
async fn repeated_edits_notify_once_until_commit() {
    let workspace = Workspace::create(builtin(), WorkspaceSettingsInitial::named("Home"))
        .await
        .unwrap();
    let (count, _subscription) = counter(&workspace);

    let background = workspace.background().settings();
    background.set_blur(10).unwrap();
    background.set_blur(20).unwrap();
    background.set_dimming(30).unwrap();

    assert!(workspace.has_changes());
    assert_eq!(count.load(Ordering::SeqCst), 1);

    workspace.commit(|_| async { Ok(()) }).await.unwrap();
    assert!(!workspace.has_changes());
    assert_eq!(count.load(Ordering::SeqCst), 2);

    // Clean again, so the next edit is a new edge.
    background.set_blur(5).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn nested_settings_mark_the_workspace_dirty() {
    let mut initial = WorkspaceSettingsInitial::named("Nested");
    initial.widgets = Some(vec![WidgetSettingsInitial::new(WidgetKind::Clock)]);
    let workspace = Workspace::create(builtin(), initial).await.unwrap();

    let WidgetExtra::TimeFormat(clock) = workspace.widgets()[0].settings().extra() else {
        panic!("clock widget without time format");
    };
    clock.set_format("%H:%M:%S").unwrap();
    assert!(workspace.has_changes());

    workspace.commit(|_| async { Ok(()) }).await.unwrap();
    workspace.widgets()[0].settings().position().move_to(3, 4);
    assert!(workspace.has_changes());
}

#[tokio::test]
async fn renaming_marks_the_workspace_dirty() {
    let workspace = Workspace::create(builtin(), WorkspaceSettingsInitial::named("Old"))
        .await
        .unwrap();

    workspace.name().set("New".to_string());

    assert!(workspace.has_changes());
    assert_eq!(workspace.snapshot().name.as_deref(), Some("New"));
}

#[tokio::test]
async fn widgets_keep_input_order_under_staggered_construction() {
    let mut initial = WorkspaceSettingsInitial::named("Ordered");
    initial.widgets = Some(vec![note("A"), note("B"), note("C")]);

    let workspace = Workspace::create(staggered_catalogs(), initial).await.unwrap();

    let texts: Vec<String> = (0..3).map(|i| note_text(&workspace, i)).collect();
    assert_eq!(texts, ["A", "B", "C"]);
}

#[tokio::test]
async fn one_failed_widget_fails_the_whole_create() {
    let mut initial = WorkspaceSettingsInitial::named("Broken");
    initial.widgets = Some(vec![note("A"), note("fail"), note("C")]);

    let result = Workspace::create(staggered_catalogs(), initial).await;

    assert!(matches!(result, Err(Error::Construction { .. })));
}

#[tokio::test]
async fn invalid_background_fails_create() {
    let mut initial = WorkspaceSettingsInitial::named("Bad color");
    initial.background = Some(
        BackgroundSettingsInitial::new(BackgroundKind::StaticColor).with_extra("color", "blue"),
    );

    let result = Workspace::create(builtin(), initial).await;

    assert!(matches!(result, Err(Error::Construction { .. })));
}

#[tokio::test]
async fn adding_and_removing_widgets_always_notify() {
    let mut workspace = Workspace::create(builtin(), WorkspaceSettingsInitial::default())
        .await
        .unwrap();
    let (count, _subscription) = counter(&workspace);
    let baseline = workspace.tracked_observables();

    let widget = workspace.add_widget(note("hello")).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(workspace.tracked_observables() > baseline);

    assert!(workspace.remove_widget(&widget));
    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert_eq!(workspace.tracked_observables(), baseline);
    assert!(workspace.widgets().is_empty());

    // No longer tracked.
    workspace.commit(|_| async { Ok(()) }).await.unwrap();
    let WidgetExtra::Note(settings) = widget.settings().extra() else {
        panic!("note widget without text");
    };
    settings.text.set("changed".to_string());
    assert!(!workspace.has_changes());
}

#[tokio::test]
async fn removing_a_non_member_changes_nothing() {
    let mut workspace = Workspace::create(builtin(), WorkspaceSettingsInitial::default())
        .await
        .unwrap();
    let mut other = Workspace::create(builtin(), WorkspaceSettingsInitial::default())
        .await
        .unwrap();
    let stranger = other.add_widget(note("elsewhere")).await.unwrap();
    let (count, _subscription) = counter(&workspace);

    assert!(!workspace.remove_widget(&stranger));

    assert!(!workspace.has_changes());
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn inserting_the_same_widget_twice_is_a_no_op() {
    let mut workspace = Workspace::create(builtin(), WorkspaceSettingsInitial::default())
        .await
        .unwrap();
    let widget = workspace.add_widget(note("once")).await.unwrap();
    let tracked = workspace.tracked_observables();

    assert!(!workspace.insert_widget(Arc::clone(&widget)));
    assert_eq!(workspace.widgets().len(), 1);
    assert_eq!(workspace.tracked_observables(), tracked);

    // Widgets with equal settings are still distinct members.
    workspace.add_widget(note("once")).await.unwrap();
    assert_eq!(workspace.widgets().len(), 2);
}

#[tokio::test]
async fn replacing_the_background_moves_tracking_to_the_new_one() {
    let mut workspace = Workspace::create(builtin(), WorkspaceSettingsInitial::default())
        .await
        .unwrap();
    let old = Arc::clone(workspace.background());
    let (count, _subscription) = counter(&workspace);

    workspace
        .set_background(
            BackgroundSettingsInitial::new(BackgroundKind::Pexels).with_extra("query", "forest"),
        )
        .await
        .unwrap();

    assert_eq!(workspace.background().kind(), BackgroundKind::Pexels);
    assert_eq!(count.load(Ordering::SeqCst), 1);

    workspace.commit(|_| async { Ok(()) }).await.unwrap();
    old.settings().set_blur(50).unwrap();
    assert!(!workspace.has_changes());

    let BackgroundExtra::Feed(feed) = workspace.background().settings().extra() else {
        panic!("pexels background without feed settings");
    };
    feed.query.set("ocean".to_string());
    assert!(workspace.has_changes());
}

#[tokio::test]
async fn failed_background_replacement_keeps_the_old_one() {
    let mut workspace = Workspace::create(builtin(), WorkspaceSettingsInitial::default())
        .await
        .unwrap();

    let result = workspace
        .set_background(
            BackgroundSettingsInitial::new(BackgroundKind::RandomColor)
                .with_extra("update_interval", 0),
        )
        .await;

    assert!(matches!(result, Err(Error::Construction { .. })));
    assert_eq!(workspace.background().kind(), BackgroundKind::StaticColor);
    assert!(!workspace.has_changes());

    workspace.background().settings().set_blur(1).unwrap();
    assert!(workspace.has_changes());
}

#[tokio::test]
async fn failed_commit_stays_dirty() {
    let workspace = Workspace::create(builtin(), WorkspaceSettingsInitial::default())
        .await
        .unwrap();
    workspace.background().settings().set_blur(10).unwrap();

    let result = workspace
        .commit(|_| async { Err(Error::Other("disk full".to_string())) })
        .await;

    assert!(matches!(result, Err(Error::Persist(_))));
    assert!(workspace.has_changes());

    workspace.commit(|_| async { Ok(()) }).await.unwrap();
    assert!(!workspace.has_changes());
}

#[tokio::test]
async fn commit_hands_over_a_snapshot_that_rebuilds_the_same_workspace() {
    let mut workspace = Workspace::create(builtin(), WorkspaceSettingsInitial::named("Trip"))
        .await
        .unwrap();
    workspace
        .set_background(BackgroundSettingsInitial::new(BackgroundKind::NasaApod))
        .await
        .unwrap();
    workspace
        .add_widget(WidgetSettingsInitial::new(WidgetKind::Clock).at(WidgetPosition {
            x: 2,
            y: 1,
            width: 3,
            height: 1,
        }))
        .await
        .unwrap();
    workspace.add_widget(note("pack socks")).await.unwrap();

    let stored = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&stored);
    workspace
        .commit(|record| async move {
            *sink.lock().unwrap() = Some(record);
            Ok(())
        })
        .await
        .unwrap();

    let record = stored.lock().unwrap().take().unwrap();
    let rebuilt = Workspace::create(builtin(), record).await.unwrap();

    assert_eq!(rebuilt.background().kind(), BackgroundKind::NasaApod);
    assert_eq!(rebuilt.widgets().len(), 2);
    assert_eq!(rebuilt.snapshot(), workspace.snapshot());
}

#[tokio::test]
async fn lock_flag_is_advisory() {
    let mut workspace = Workspace::create(builtin(), WorkspaceSettingsInitial::default())
        .await
        .unwrap();
    workspace.set_locked(true);

    workspace.add_widget(note("still allowed")).await.unwrap();

    assert!(workspace.is_locked());
    assert_eq!(workspace.widgets().len(), 1);
}
