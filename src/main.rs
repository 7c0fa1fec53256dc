//! Fieldstore CLI - define components, place them on content items, store and render values

use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use fieldstore::authoring::Authoring;
use fieldstore::config::{self, FieldstoreConfig};
use fieldstore::scaffold::{FsScaffolder, NoopScaffolder, Scaffolder};
use fieldstore::storage::SqliteStore;
use fieldstore::ui::{self, table::stats_table, Icons, TableBuilder};
use fieldstore::{Component, FieldConfig, FieldType, NewComponent, NewField, NewValue, Renderer};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "fieldstore")]
#[command(version)]
#[command(about = "Reusable content components with typed fields")]
#[command(long_about = r#"
Fieldstore keeps component schemas, per-item field values and placements in
one SQLite database, and resolves stored values into typed data.

Example usage:
  fieldstore init --scaffold-dir templates
  fieldstore component add --name Hero
  fieldstore field add --component hero --name title --type text
  fieldstore assign add --item 42 --component hero
  fieldstore values set --item 42 --set 1=Welcome
  fieldstore render --item 42
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the database file (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the database
    Init {
        /// Directory for scaffolded component templates
        #[arg(long)]
        scaffold_dir: Option<String>,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Manage components
    #[command(subcommand)]
    Component(ComponentCommand),

    /// Manage fields of a component
    #[command(subcommand)]
    Field(FieldCommand),

    /// Store and inspect raw values of a content item
    #[command(subcommand)]
    Values(ValuesCommand),

    /// Manage component placements on a content item
    #[command(subcommand)]
    Assign(AssignCommand),

    /// Resolve every placement of a content item
    Render {
        /// Content item id
        #[arg(short, long)]
        item: i64,
    },

    /// Show statistics about the database
    Stats,

    /// Serve the read-only JSON render API
    Serve {
        /// Address to bind (default 127.0.0.1:7878)
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[derive(Subcommand)]
enum ComponentCommand {
    /// Create a component
    Add(ComponentArgs),
    /// List components in display order
    List,
    /// Show a component and its fields
    Show {
        handle: String,
    },
    /// Delete a component with its fields and values
    Delete {
        handle: String,
    },
}

#[derive(Args)]
struct ComponentArgs {
    /// Display name
    #[arg(short, long)]
    name: String,

    /// Machine name (derived from the name when omitted)
    #[arg(long)]
    handle: Option<String>,

    /// Guidance shown to authors
    #[arg(long)]
    instruction: Option<String>,

    /// Hide from the placement picker
    #[arg(long)]
    hidden: bool,

    /// Display order
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    order: i64,
}

#[derive(Subcommand)]
enum FieldCommand {
    /// Add a field to a component
    Add(FieldArgs),
    /// List the fields of a component
    List {
        /// Component handle
        #[arg(long)]
        component: String,
    },
    /// Delete a field and its stored values
    Delete {
        id: i64,
    },
}

#[derive(Args)]
struct FieldArgs {
    /// Component handle
    #[arg(long)]
    component: String,

    /// Machine name
    #[arg(short, long)]
    name: String,

    /// Label (defaults to the name)
    #[arg(short, long)]
    label: Option<String>,

    /// Field type (text, textarea, image, repeater, color, select, checkbox,
    /// radio, toggle, wysiwyg, page_link, taxonomy_term, video)
    #[arg(short = 't', long = "type", default_value = "text")]
    field_type: String,

    /// Type-specific configuration as JSON
    #[arg(long = "field-config")]
    field_config: Option<String>,

    #[arg(long)]
    required: bool,

    #[arg(long)]
    placeholder: Option<String>,

    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    order: i64,
}

#[derive(Subcommand)]
enum ValuesCommand {
    /// Replace the stored values of one placement instance (or the unscoped values)
    Set {
        /// Content item id
        #[arg(short, long)]
        item: i64,

        /// FIELD_ID=VALUE, repeatable
        #[arg(short = 's', long = "set", value_parser = parse_assignment)]
        values: Vec<(i64, String)>,

        /// Placement instance the values belong to
        #[arg(long)]
        instance: Option<String>,
    },
    /// List stored rows of a content item
    Show {
        #[arg(short, long)]
        item: i64,
    },
}

#[derive(Subcommand)]
enum AssignCommand {
    /// Place a component on a content item
    Add {
        #[arg(short, long)]
        item: i64,

        /// Component handle
        #[arg(long)]
        component: String,

        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        order: i64,
    },
    /// List placements in render order
    List {
        #[arg(short, long)]
        item: i64,
    },
    /// Remove a placement
    Remove {
        #[arg(short, long)]
        item: i64,

        #[arg(long)]
        instance: String,
    },
}

fn parse_assignment(s: &str) -> Result<(i64, String), String> {
    let (id, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD_ID=VALUE, got '{}'", s))?;
    let id = id.trim().parse().map_err(|_| format!("invalid field id '{}'", id))?;
    Ok((id, value.to_string()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let settings = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    let cwd = std::env::current_dir()?;
    let database = settings.database_path(cli.database.as_deref(), &cwd);

    let open_store = || -> anyhow::Result<SqliteStore> {
        config::ensure_db_dir(&database)?;
        Ok(SqliteStore::open(&database)?)
    };

    match cli.command {
        Commands::Init { scaffold_dir, force } => {
            run_init(cli.config.as_deref(), &settings, &database, scaffold_dir, force)?
        }

        Commands::Component(cmd) => run_component(cmd, &open_store()?, &settings, cli.json)?,
        Commands::Field(cmd) => run_field(cmd, &open_store()?, cli.json)?,
        Commands::Values(cmd) => run_values(cmd, &open_store()?, cli.json)?,
        Commands::Assign(cmd) => run_assign(cmd, &open_store()?, cli.json)?,

        Commands::Render { item } => {
            let store = open_store()?;
            let rendered = Renderer::new(&store).render(item)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&rendered)?);
            } else if rendered.is_empty() {
                ui::info("Nothing placed on content item", &item.to_string());
            } else {
                for component in rendered {
                    ui::section(&format!(
                        "{} [{}] order {}",
                        component.handle,
                        component.instance_id.as_deref().unwrap_or("-"),
                        component.order
                    ));
                    for (name, value) in &component.fields {
                        ui::summary_row(name, &value.to_string());
                    }
                }
            }
        }

        Commands::Stats => {
            let stats = open_store()?.stats()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{} Fieldstore Statistics ({})", Icons::STATS, database.display());
                println!(
                    "{}",
                    stats_table(&[
                        ("Components", stats.components.to_string()),
                        ("Fields", stats.fields.to_string()),
                        ("Values", stats.values.to_string()),
                        ("Content items", stats.content_items.to_string()),
                    ])
                );
            }
        }

        Commands::Serve { bind } => {
            let addr: SocketAddr = settings.bind_address(bind.as_deref()).parse()?;
            println!("{} Serving {} at http://{}", Icons::GLOBE, database.display(), addr);
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(fieldstore::server::start_server(addr, database.clone()))?;
        }
    }

    Ok(())
}

fn run_init(
    config_path: Option<&Path>,
    settings: &FieldstoreConfig,
    database: &Path,
    scaffold_dir: Option<String>,
    force: bool,
) -> anyhow::Result<()> {
    let path = config_path.map(Path::to_path_buf).unwrap_or_else(config::default_config_path);
    let written = FieldstoreConfig {
        database: Some(database.display().to_string()),
        scaffold_dir: scaffold_dir.or_else(|| settings.scaffold_dir.clone()),
        bind: settings.bind.clone(),
    };
    config::write_config(&path, &written, force)?;
    config::ensure_db_dir(database)?;
    let store = SqliteStore::open(database)?;

    ui::success(&format!("Wrote {}", path.display()));
    ui::info(
        &format!("{} Database", Icons::DATABASE),
        &format!("{} (schema v{})", database.display(), store.schema_version()?.unwrap_or_default()),
    );
    Ok(())
}

fn scaffolder_for(settings: &FieldstoreConfig) -> Box<dyn Scaffolder> {
    match &settings.scaffold_dir {
        Some(dir) => Box::new(FsScaffolder::new(dir)),
        None => Box::new(NoopScaffolder),
    }
}

fn component_by_handle(store: &SqliteStore, handle: &str) -> anyhow::Result<Component> {
    store
        .get_component_by_handle(handle)?
        .ok_or_else(|| fieldstore::Error::UnknownComponent(handle.to_string()).into())
}

fn run_component(
    cmd: ComponentCommand,
    store: &SqliteStore,
    settings: &FieldstoreConfig,
    json: bool,
) -> anyhow::Result<()> {
    let scaffolder = scaffolder_for(settings);
    let authoring = Authoring::new(store, scaffolder.as_ref());

    match cmd {
        ComponentCommand::Add(args) => {
            let new = NewComponent {
                name: args.name,
                handle: args.handle,
                instruction: args.instruction,
                hidden: args.hidden,
                order: args.order,
            };
            let component = authoring.create_component(&new)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&component)?);
            } else {
                ui::success(&format!(
                    "{} Created component '{}' (id {})",
                    Icons::PACKAGE, component.handle, component.id
                ));
            }
        }

        ComponentCommand::List => {
            let components = store.list_components()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&components)?);
                return Ok(());
            }
            let mut table = TableBuilder::new(["Id", "Handle", "Name", "Order", "Hidden"]);
            for c in &components {
                table.add_row([
                    c.id.to_string(),
                    c.handle.clone(),
                    c.name.clone(),
                    c.order.to_string(),
                    if c.hidden { "yes".to_string() } else { String::new() },
                ]);
            }
            if table.is_empty() {
                ui::info("Components", "none");
            } else {
                println!("{}", table.build());
            }
        }

        ComponentCommand::Show { handle } => {
            let component = component_by_handle(store, &handle)?;
            let fields = store.find_fields_of_component(component.id)?;
            if json {
                let doc = serde_json::json!({ "component": component, "fields": fields });
                println!("{}", serde_json::to_string_pretty(&doc)?);
                return Ok(());
            }
            ui::header(&format!("{} ({})", component.name, component.handle));
            if let Some(instruction) = &component.instruction {
                ui::summary_row("Instruction", instruction);
            }
            print_fields(&fields);
        }

        ComponentCommand::Delete { handle } => {
            let component = component_by_handle(store, &handle)?;
            let stored = store.count_values_of_component(component.id)?;
            authoring.delete_component(component.id)?;
            if stored > 0 {
                ui::warn(&format!("Removed {} stored values of component '{}'", stored, handle));
            }
            ui::success(&format!("{} Deleted component '{}'", Icons::DEL, handle));
        }
    }

    Ok(())
}

fn print_fields(fields: &[fieldstore::Field]) {
    let mut table = TableBuilder::new(["Id", "Name", "Label", "Type", "Required", "Config"]);
    for f in fields {
        table.add_row([
            f.id.to_string(),
            f.name.clone(),
            f.label.clone(),
            f.field_type.to_string(),
            if f.required { "yes".to_string() } else { String::new() },
            f.config.to_json(),
        ]);
    }
    if table.is_empty() {
        ui::info("Fields", "none");
    } else {
        println!("{}", table.build());
    }
}

fn run_field(cmd: FieldCommand, store: &SqliteStore, json: bool) -> anyhow::Result<()> {
    let authoring = Authoring::new(store, &NoopScaffolder);

    match cmd {
        FieldCommand::Add(args) => {
            let component = component_by_handle(store, &args.component)?;
            let field_type: FieldType = args.field_type.parse()?;
            let config = match &args.field_config {
                Some(text) => {
                    let value: serde_json::Value = serde_json::from_str(text)?;
                    FieldConfig::from_value(field_type, &value)
                }
                None => FieldConfig::default_for(field_type),
            };

            let mut new = NewField::new(
                component.id,
                args.label.unwrap_or_else(|| args.name.clone()),
                args.name,
                field_type,
            )
            .with_config(config)
            .with_order(args.order)
            .required(args.required);
            new.placeholder = args.placeholder;

            let field = authoring.create_field(&new)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&field)?);
            } else {
                ui::success(&format!("Added {} field '{}' (id {})", field.field_type, field.name, field.id));
            }
        }

        FieldCommand::List { component } => {
            let component = component_by_handle(store, &component)?;
            let fields = store.find_fields_of_component(component.id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&fields)?);
            } else {
                print_fields(&fields);
            }
        }

        FieldCommand::Delete { id } => {
            let stored = store.count_values_of_fields(&[id])?;
            let field = authoring.delete_field(id)?;
            if stored > 0 {
                ui::warn(&format!("Removed {} stored values of field '{}'", stored, field.name));
            }
            ui::success(&format!("{} Deleted field '{}'", Icons::DEL, field.name));
        }
    }

    Ok(())
}

fn run_values(cmd: ValuesCommand, store: &SqliteStore, json: bool) -> anyhow::Result<()> {
    match cmd {
        ValuesCommand::Set { item, values, instance } => {
            let rows = values.into_iter().map(|(field_id, value)| NewValue::new(field_id, value));
            let written = store.save_instance_values(item, instance.as_deref(), rows)?;
            ui::success(&format!(
                "Stored {} values for content item {} instance {}",
                written, item, instance.as_deref().unwrap_or("-")
            ));
        }

        ValuesCommand::Show { item } => {
            let rows = store.values_of_content_item(item)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
                return Ok(());
            }
            let mut table = TableBuilder::new(["Id", "Field", "Instance", "Value"]);
            for row in &rows {
                table.add_row([
                    row.id.to_string(),
                    row.field_id.to_string(),
                    row.instance_id.clone().unwrap_or_default(),
                    row.value.clone(),
                ]);
            }
            if table.is_empty() {
                ui::info("Values", "none");
            } else {
                println!("{}", table.build());
            }
        }
    }

    Ok(())
}

fn run_assign(cmd: AssignCommand, store: &SqliteStore, json: bool) -> anyhow::Result<()> {
    match cmd {
        AssignCommand::Add { item, component, order } => {
            let component = component_by_handle(store, &component)?;
            let placement = store.assign_component(item, component.id, order)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&placement)?);
            } else {
                ui::success(&format!(
                    "{} Placed '{}' on content item {} as instance {}",
                    Icons::LINK,
                    component.handle,
                    item,
                    placement.instance_id.as_deref().unwrap_or("-")
                ));
            }
        }

        AssignCommand::List { item } => {
            let placements = store.assigned_components(item)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&placements)?);
                return Ok(());
            }
            let mut table = TableBuilder::new(["Order", "Component", "Instance"]);
            for p in &placements {
                let handle = store
                    .get_component(p.component_id)?
                    .map(|c| c.handle)
                    .unwrap_or_else(|| ui::muted(&format!("missing #{}", p.component_id)));
                table.add_row([p.order.to_string(), handle, p.instance_id.clone().unwrap_or_default()]);
            }
            if table.is_empty() {
                ui::info("Placements", "none");
            } else {
                println!("{}", table.build());
            }
        }

        AssignCommand::Remove { item, instance } => {
            let removed = store.unassign(item, &instance)?;
            ui::success(&format!(
                "Removed instance {} of component {} from content item {}",
                instance, removed.component_id, item
            ));
        }
    }

    Ok(())
}
