//! tabdeck CLI: operator interface to the workspace store.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tabdeck::catalog::Catalogs;
use tabdeck::config::Config;
use tabdeck::index::WorkspaceIndex;
use tabdeck::settings::widget::WidgetExtra;
use tabdeck::settings::{
    BackgroundKind, BackgroundSettingsInitial, WidgetKind, WidgetPosition, WidgetSettingsInitial,
    WorkspaceSettingsInitial,
};
use tabdeck::storage::Backend;
use tabdeck::telemetry::{TelemetryConfig, init_telemetry};
use tabdeck::workspace::Workspace;

#[derive(Parser)]
#[command(name = "tabdeck", about = "Manage saved new-tab workspaces")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List saved workspaces
    List,
    /// Show a workspace
    Show {
        /// Workspace id (defaults to the default workspace)
        id: Option<String>,
    },
    /// Create and save a new workspace
    Create {
        name: String,
        /// Id to save under (random if omitted)
        #[arg(long)]
        id: Option<String>,
        /// Background kind, e.g. "bing-daily-image"
        #[arg(long)]
        background: Option<BackgroundKind>,
    },
    /// Rename a workspace
    Rename { id: String, name: String },
    /// Replace a workspace's background
    SetBackground {
        id: String,
        kind: BackgroundKind,
        /// Blur percentage (0-100)
        #[arg(long)]
        blur: Option<u8>,
        /// Dimming percentage (0-100)
        #[arg(long)]
        dimming: Option<u8>,
        /// Kind-specific field as key=value; value is parsed as JSON when possible
        #[arg(long = "set", value_parser = parse_extra)]
        extra: Vec<(String, serde_json::Value)>,
    },
    /// Add a widget to a workspace
    AddWidget {
        id: String,
        kind: WidgetKind,
        #[arg(long, default_value_t = 0)]
        x: i32,
        #[arg(long, default_value_t = 0)]
        y: i32,
        #[arg(long, default_value_t = 4)]
        width: u32,
        #[arg(long, default_value_t = 2)]
        height: u32,
        /// Kind-specific field as key=value, e.g. format=%H:%M or text=hello
        #[arg(long = "set", value_parser = parse_extra)]
        extra: Vec<(String, serde_json::Value)>,
    },
    /// Remove the widget at a position in the widget list
    RemoveWidget { id: String, position: usize },
    /// Save a workspace record read from a TOML file
    Import { id: String, file: PathBuf },
    /// Print a workspace record as TOML
    Export { id: String },
    /// Delete workspaces
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Choose the default workspace
    SetDefault { id: String },
    /// Erase all stored data
    Wipe {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
    /// List background and widget kinds
    Catalog,
}

fn parse_extra(s: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {s:?}"))?;
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "tabdeck".to_string(),
        log_level: config.log_level.clone(),
    })?;

    let storage = Arc::new(Backend::open(&config.storage).await?);
    let mut index = WorkspaceIndex::create(storage, Arc::new(Catalogs::builtin())).await?;

    match cli.command {
        Command::List => cmd_list(&index),
        Command::Show { id } => cmd_show(&index, id).await,
        Command::Create {
            name,
            id,
            background,
        } => cmd_create(&mut index, name, id, background).await,
        Command::Rename { id, name } => {
            let workspace = index.get(&id).await?;
            workspace.name().set(name);
            index.save(&id, &workspace).await?;
            Ok(())
        }
        Command::SetBackground {
            id,
            kind,
            blur,
            dimming,
            extra,
        } => {
            let mut initial = BackgroundSettingsInitial::new(kind);
            initial.blur = blur;
            initial.dimming = dimming;
            let initial = extra
                .into_iter()
                .fold(initial, |initial, (key, value)| initial.with_extra(key, value));

            let mut workspace = index.get(&id).await?;
            workspace.set_background(initial).await?;
            index.save(&id, &workspace).await?;
            Ok(())
        }
        Command::AddWidget {
            id,
            kind,
            x,
            y,
            width,
            height,
            extra,
        } => {
            let initial = WidgetSettingsInitial::new(kind).at(WidgetPosition {
                x,
                y,
                width,
                height,
            });
            let initial = extra
                .into_iter()
                .fold(initial, |initial, (key, value)| initial.with_extra(key, value));

            let mut workspace = index.get(&id).await?;
            workspace.add_widget(initial).await?;
            index.save(&id, &workspace).await?;
            println!("Added {kind} widget at position {}", workspace.widgets().len() - 1);
            Ok(())
        }
        Command::RemoveWidget { id, position } => {
            let mut workspace = index.get(&id).await?;
            let Some(widget) = workspace.widgets().get(position).cloned() else {
                anyhow::bail!(
                    "workspace '{id}' has {} widget(s), no position {position}",
                    workspace.widgets().len()
                );
            };
            workspace.remove_widget(&widget);
            index.save(&id, &workspace).await?;
            Ok(())
        }
        Command::Import { id, file } => {
            let text = std::fs::read_to_string(&file)?;
            let record: WorkspaceSettingsInitial = toml::from_str(&text)?;
            // Refuse records that would not load.
            Workspace::create(Arc::clone(index.catalogs()), record.clone()).await?;
            index.save(&id, record).await?;
            println!("Imported {} as '{id}'", file.display());
            Ok(())
        }
        Command::Export { id } => {
            let record = index.initial_settings(&id).await;
            print!("{}", toml::to_string_pretty(&record)?);
            Ok(())
        }
        Command::Delete { ids } => {
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            index.delete(&ids).await?;
            Ok(())
        }
        Command::SetDefault { id } => {
            index.set_default(&id).await?;
            Ok(())
        }
        Command::Wipe { yes } => {
            if !yes {
                anyhow::bail!("refusing to wipe storage without --yes");
            }
            index.wipe_all().await?;
            println!("Storage wiped.");
            Ok(())
        }
        Command::Catalog => {
            cmd_catalog(index.catalogs());
            Ok(())
        }
    }
}

fn cmd_catalog(catalogs: &Catalogs) {
    println!("Backgrounds:");
    for (kind, entry) in catalogs.backgrounds.iter() {
        println!("  {:<24}  {}", kind, entry.name());
    }
    println!("Widgets:");
    for (kind, entry) in catalogs.widgets.iter() {
        println!("  {:<24}  {}", kind, entry.name());
    }
}

fn cmd_list<S>(index: &WorkspaceIndex<S>) -> anyhow::Result<()>
where
    S: tabdeck::storage::Storage + 'static,
{
    if index.entries().is_empty() {
        println!("No workspaces found.");
        return Ok(());
    }

    println!("{:<3}  {:<36}  NAME", "", "ID");
    println!("{}", "-".repeat(60));
    for entry in index.entries() {
        let marker = if entry.id == index.default_id() { "*" } else { "" };
        println!("{:<3}  {:<36}  {}", marker, entry.id, entry.name);
    }
    println!("\n{} workspace(s)", index.entries().len());
    Ok(())
}

async fn cmd_show<S>(index: &WorkspaceIndex<S>, id: Option<String>) -> anyhow::Result<()>
where
    S: tabdeck::storage::Storage + 'static,
{
    let (id, workspace) = match id {
        Some(id) => {
            let workspace = index.get(&id).await?;
            (id, workspace)
        }
        None => index.get_default().await?,
    };

    let background = workspace.background().settings();
    println!("ID:          {id}");
    println!("Name:        {}", workspace.name().get());
    println!("Background:  {}", background.kind());
    println!("Blur:        {}%", background.blur().get());
    println!("Dimming:     {}%", background.dimming().get());

    if workspace.widgets().is_empty() {
        println!("Widgets:     -");
        return Ok(());
    }
    println!("Widgets:");
    let now = chrono::Local::now();
    for (position, widget) in workspace.widgets().iter().enumerate() {
        let settings = widget.settings();
        let at = settings.position().get();
        let preview = match settings.extra() {
            WidgetExtra::TimeFormat(s) => s.render(&now).unwrap_or_else(|| "-".to_string()),
            WidgetExtra::Note(s) => s.text.get(),
        };
        println!(
            "  [{position}] {:<6} {}x{} at ({}, {})  {}",
            widget.kind(),
            at.width,
            at.height,
            at.x,
            at.y,
            preview
        );
    }
    Ok(())
}

async fn cmd_create<S>(
    index: &mut WorkspaceIndex<S>,
    name: String,
    id: Option<String>,
    background: Option<BackgroundKind>,
) -> anyhow::Result<()>
where
    S: tabdeck::storage::Storage + 'static,
{
    let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    if index.entries().iter().any(|entry| entry.id == id) {
        anyhow::bail!("workspace '{id}' already exists");
    }

    let mut initial = WorkspaceSettingsInitial::named(name);
    initial.background = background.map(BackgroundSettingsInitial::new);
    let workspace = Workspace::create(Arc::clone(index.catalogs()), initial).await?;
    index.save(&id, &workspace).await?;

    println!("Created: {id}");
    Ok(())
}
