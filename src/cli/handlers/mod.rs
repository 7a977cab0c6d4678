mod init;
use init::cmd_init;

use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::store::{FileStore, ProjectStore, StoreError};
use crate::model::config::Config;
use crate::model::item::Substatus;
use crate::ops::bom::{self, BomFilter};
use crate::ops::calc;
use crate::ops::item_ops::find_item;
use crate::ops::lookup::{self, LookupError, Part};
use crate::ops::tracker::Tracker;
use crate::ops::transfer::export_file_name;
use crate::ops::tree::StatusFilter;
use crate::util::natural_cmp;

/// Settings resolved from the global flags and the config file
struct Context {
    json: bool,
    project: Option<String>,
    config: Config,
    config_path: PathBuf,
    store_dir: PathBuf,
    /// `--store` was given on the command line
    store_overridden: bool,
}

impl Context {
    fn resolve(cli: &Cli) -> Result<Context, Box<dyn std::error::Error>> {
        let config_path = cli.config.clone().unwrap_or_else(config_io::config_path);
        let config = config_io::read_config_from(&config_path)?;
        let store_dir = cli
            .store
            .clone()
            .unwrap_or_else(|| config_io::store_dir(&config));
        let project = cli
            .project
            .clone()
            .or_else(|| config.tracker.default_project.clone());
        tracing::debug!(
            config = %config_path.display(),
            store = %store_dir.display(),
            project = ?project,
            "resolved settings"
        );
        Ok(Context {
            json: cli.json,
            project,
            config,
            config_path,
            store_dir,
            store_overridden: cli.store.is_some(),
        })
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::resolve(&cli)?;

    match cli.command {
        Commands::Init(args) => cmd_init(args, &ctx),
        Commands::Projects(args) => cmd_projects(args, &ctx),

        // Progress tracker
        Commands::Tree(args) => cmd_tree(args, &ctx),
        Commands::Items => cmd_items(&ctx),
        Commands::Add(args) => cmd_add(args, &ctx),
        Commands::Rm(args) => cmd_rm(args, &ctx),
        Commands::Status(args) => cmd_status(args, &ctx),
        Commands::Substatus(args) => cmd_substatus(args, &ctx),
        Commands::Note(args) => cmd_note(args, &ctx),
        Commands::Notes(args) => cmd_notes(args, &ctx),
        Commands::Export(args) => cmd_export(args, &ctx),
        Commands::Import(args) => cmd_import(args, &ctx),

        // Shop tools
        Commands::Calc(args) => cmd_calc(args, ctx.json),
        Commands::Bom(args) => cmd_bom(args, ctx.json),
        Commands::Lookup(args) => cmd_lookup(args, &ctx),
        Commands::Fuzzy(args) => cmd_fuzzy(args, &ctx),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Open the selected project. Unlike `Tracker::open`, a project that is not
/// in the store is an error here rather than an empty project.
fn open_tracker(ctx: &Context) -> Result<Tracker<FileStore>, Box<dyn std::error::Error>> {
    let name = ctx
        .project
        .as_deref()
        .ok_or("no project selected (pass --project or set tracker.default_project)")?;
    let store = FileStore::open(&ctx.store_dir)?;
    if !store.exists(name)? {
        return Err(format!("project not found: {} (see `hk projects`)", name).into());
    }
    let mut tracker = Tracker::new(store);
    tracker.open(name)?;
    Ok(tracker)
}

/// Print the current state of one item after a change
fn print_item(tracker: &Tracker<FileStore>, id: &str) {
    if let Some(item) = find_item(tracker.items(), id.trim()) {
        println!("{}", format_item_line(item));
    }
}

fn load_parts(catalog: Option<PathBuf>, ctx: &Context) -> Result<Vec<Part>, LookupError> {
    let path = catalog
        .or_else(|| ctx.config.lookup.catalog.clone())
        .ok_or(LookupError::NoCatalog)?;
    lookup::load_catalog(&path)
}

fn read_file(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("could not read {}: {}", path.display(), e))
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

fn cmd_projects(args: ProjectsCmd, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    match args.action {
        None | Some(ProjectsAction::List) => cmd_projects_list(ctx),
        Some(ProjectsAction::New(a)) => {
            let mut tracker = Tracker::new(FileStore::open(&ctx.store_dir)?);
            tracker.create_project(&a.name)?;
            println!("Created: {}", a.name);
            Ok(())
        }
        Some(ProjectsAction::Rm(a)) => {
            let mut tracker = Tracker::new(FileStore::new(&ctx.store_dir));
            tracker.delete_project(&a.name)?;
            println!("Removed: {}", a.name);
            Ok(())
        }
    }
}

fn cmd_projects_list(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::new(&ctx.store_dir);
    let names = store.list_projects()?;

    if ctx.json {
        #[derive(serde::Serialize)]
        struct ProjectJson {
            name: String,
            items: usize,
            default: bool,
        }
        let projects = names
            .iter()
            .map(|name| {
                Ok(ProjectJson {
                    items: store.load_project(name)?.len(),
                    default: ctx.project.as_deref() == Some(name.as_str()),
                    name: name.clone(),
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        println!("{}", serde_json::to_string_pretty(&projects)?);
        return Ok(());
    }

    if names.is_empty() {
        println!("No projects in {}.", store.dir().display());
        println!();
        println!("Run `hk init` to create the sample projects,");
        println!("or `hk projects new <name>` to start an empty one.");
        return Ok(());
    }

    for name in &names {
        let marker = if ctx.project.as_deref() == Some(name.as_str()) {
            '*'
        } else {
            ' '
        };
        let count = store.load_project(name)?.len();
        println!("{} {}  ({} items)", marker, name, count);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_tree(args: TreeArgs, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let filter = StatusFilter::parse(&args.filter).ok_or_else(|| {
        format!(
            "unknown filter '{}' (expected: all, not_started, work_in_progress, completed)",
            args.filter
        )
    })?;
    let mut tracker = open_tracker(ctx)?;
    tracker.set_filter(filter);
    let visible = tracker.visible_ids()?;
    let roots = tracker.tree()?;
    let name = tracker.current().unwrap_or_default().to_string();

    if ctx.json {
        #[derive(serde::Serialize)]
        struct TreeJson {
            project: String,
            roots: Vec<TreeNodeJson>,
        }
        let out = TreeJson {
            project: name,
            roots: roots
                .iter()
                .filter(|r| visible.contains(r.id()))
                .map(|r| tree_to_json(r, Some(&visible)))
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("== {} ==", name);
    let lines = format_tree(&roots, &visible);
    if lines.is_empty() {
        println!("No items.");
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_items(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let tracker = open_tracker(ctx)?;
    let mut items: Vec<_> = tracker.items().iter().collect();
    items.sort_by(|a, b| natural_cmp(&a.id, &b.id));

    if ctx.json {
        let out: Vec<ItemJson> = items.iter().map(|i| item_to_json(i)).collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }
    for item in items {
        println!("{}", format_item_line(item));
    }
    Ok(())
}

fn cmd_notes(args: IdArg, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let tracker = open_tracker(ctx)?;
    let item = find_item(tracker.items(), &args.id)
        .ok_or_else(|| format!("item not found: {}", args.id))?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&item.notes)?);
        return Ok(());
    }
    if item.notes.is_empty() {
        println!("No notes for {}.", item.id);
    }
    for note in &item.notes {
        println!("{}", format_note_line(note));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_add(args: AddArgs, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let mut tracker = open_tracker(ctx)?;
    tracker.add_item(args.parent.as_deref(), &args.id, &args.description)?;
    println!("{}", args.id.trim());
    Ok(())
}

fn cmd_rm(args: IdArg, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let mut tracker = open_tracker(ctx)?;
    let removed = tracker.delete_item(&args.id)?;
    println!("deleted {} item(s)", removed.len());
    for id in &removed {
        println!("  {}", id);
    }
    Ok(())
}

fn cmd_status(args: StatusArgs, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let status = parse_status(&args.status)?;
    let mut tracker = open_tracker(ctx)?;
    tracker.set_status(&args.id, status)?;
    print_item(&tracker, &args.id);
    Ok(())
}

fn cmd_substatus(args: SubstatusArgs, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let mut tracker = open_tracker(ctx)?;
    tracker.set_substatus(&args.id, Substatus::from(args.substatus.trim()))?;
    print_item(&tracker, &args.id);
    Ok(())
}

fn cmd_note(args: NoteArgs, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let mut tracker = open_tracker(ctx)?;
    tracker.add_note(&args.id, &args.text)?;
    if let Some(note) = find_item(tracker.items(), &args.id).and_then(|i| i.notes.last()) {
        println!("{}", format_note_line(note));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Import / export
// ---------------------------------------------------------------------------

fn cmd_export(args: ExportArgs, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let mut tracker = open_tracker(ctx)?;
    let text = tracker.export_json()?;
    let name = tracker.current().unwrap_or_default().to_string();

    let path = args.out.unwrap_or_else(|| PathBuf::from(export_file_name(&name)));
    if path.as_os_str() == "-" {
        println!("{}", text);
        return Ok(());
    }
    fs::write(&path, text).map_err(|e| format!("could not write {}: {}", path.display(), e))?;
    println!("exported {} to {}", name, path.display());
    Ok(())
}

fn cmd_import(args: ImportArgs, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let text = read_file(&args.file)?;
    let mut tracker = Tracker::new(FileStore::open(&ctx.store_dir)?);
    let name = tracker.import(&text)?;
    println!("imported {} ({} items)", name, tracker.items().len());
    Ok(())
}

// ---------------------------------------------------------------------------
// Calculators
// ---------------------------------------------------------------------------

fn print_quantity(json: bool, value: f64, unit: &str, decimals: usize) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        let out = CalcJson {
            value,
            unit: unit.to_string(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{:.*} {}", decimals, value, unit);
    }
    Ok(())
}

fn cmd_calc(args: CalcCmd, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    match args.action {
        CalcAction::PressureDrop(a) => {
            let psi = calc::pressure_drop(a.flow, a.diameter, a.length, a.viscosity)?;
            print_quantity(json, psi, "psi", 2)
        }
        CalcAction::CylinderForce(a) => {
            let lbf = calc::cylinder_force(a.bore, a.pressure)?;
            print_quantity(json, lbf, "lbf", 2)
        }
        CalcAction::PumpPower(a) => {
            let hp = calc::pump_power(a.flow, a.pressure, a.efficiency)?;
            print_quantity(json, hp, "hp", 3)
        }
        CalcAction::Convert(a) => {
            let (value, unit) = calc::convert(a.value, &a.category, &a.from, &a.to)?;
            print_quantity(json, value, unit.key, 4)
        }
    }
}

// ---------------------------------------------------------------------------
// Parts
// ---------------------------------------------------------------------------

fn cmd_bom(args: BomArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let filter = BomFilter::parse(&args.filter).ok_or_else(|| {
        format!(
            "unknown filter '{}' (expected: all, changed, added, removed, qty_change, unchanged)",
            args.filter
        )
    })?;
    if args.scale.is_nan() || args.scale <= 0.0 {
        return Err("scale must be a positive number".into());
    }

    let old = bom::parse_bom(&read_file(&args.old)?);
    let new = bom::parse_bom(&read_file(&args.new)?);
    for (label, parsed, path) in [("old", &old, &args.old), ("new", &new, &args.new)] {
        if !parsed.is_valid() {
            let lines: Vec<String> = parsed.invalid_lines.iter().map(|n| n.to_string()).collect();
            return Err(format!(
                "{} BOM {} has unreadable lines: {} (expected `PART QTY`)",
                label,
                path.display(),
                lines.join(", ")
            )
            .into());
        }
    }

    let rows = bom::compare_boms(&old, &new, args.scale);
    let shown: Vec<_> = rows.iter().filter(|r| filter.matches(r.status)).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }
    if shown.is_empty() {
        println!("No matching rows.");
        return Ok(());
    }
    for line in format_bom_table(&shown) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_lookup(args: LookupArgs, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let parts = load_parts(args.catalog, ctx)?;
    let hits = lookup::lookup(&parts, args.part.as_deref(), args.desc.as_deref())?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }
    if hits.is_empty() {
        println!("No matching parts.");
        return Ok(());
    }
    for line in format_parts(&hits) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_fuzzy(args: FuzzyArgs, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let parts = load_parts(args.catalog, ctx)?;
    let limit = args.limit.unwrap_or(ctx.config.lookup.fuzzy_limit);
    let hits = lookup::fuzzy_search(&parts, &args.query, limit);

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }
    if hits.is_empty() {
        println!("No matching parts.");
        return Ok(());
    }
    for line in format_fuzzy_hits(&hits) {
        println!("{}", line);
    }
    Ok(())
}
