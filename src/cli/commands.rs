use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "hk", about = concat!("hydrokit v", env!("CARGO_PKG_VERSION"), " - shop progress tracking and hydraulics tools"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Project to work on (default: tracker.default_project from config)
    #[arg(short = 'p', long, global = true)]
    pub project: Option<String>,

    /// Project store directory (overrides store.dir)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Config file to read instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the project store and seed the sample projects
    Init(InitArgs),
    /// List, create or delete projects
    Projects(ProjectsCmd),
    /// Show the progress tree
    Tree(TreeArgs),
    /// List every item flat, in id order
    Items,
    /// Add an item
    Add(AddArgs),
    /// Delete an item and everything under it
    Rm(IdArg),
    /// Set an item's status
    Status(StatusArgs),
    /// Set an item's substatus
    Substatus(SubstatusArgs),
    /// Add a dated note to an item
    Note(NoteArgs),
    /// Show an item's notes
    Notes(IdArg),
    /// Export the project as JSON
    Export(ExportArgs),
    /// Import a project from an export file
    Import(ImportArgs),
    /// Hydraulic calculators and unit conversion
    Calc(CalcCmd),
    /// Compare two bills of materials
    Bom(BomArgs),
    /// Look up parts by wildcard
    Lookup(LookupArgs),
    /// Fuzzy-search parts by description
    Fuzzy(FuzzyArgs),
}

// ---------------------------------------------------------------------------
// Project args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Don't create the sample projects
    #[arg(long)]
    pub no_samples: bool,
}

#[derive(Args)]
pub struct ProjectsCmd {
    #[command(subcommand)]
    pub action: Option<ProjectsAction>,
}

#[derive(Subcommand)]
pub enum ProjectsAction {
    /// List projects in the store
    List,
    /// Create an empty project
    New(ProjectNameArg),
    /// Delete a project
    Rm(ProjectNameArg),
}

#[derive(Args)]
pub struct ProjectNameArg {
    /// Project name
    pub name: String,
}

// ---------------------------------------------------------------------------
// Tracker args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct TreeArgs {
    /// Only show branches containing items with this status
    /// (all, not_started, work_in_progress, completed)
    #[arg(long, default_value = "all")]
    pub filter: String,
}

#[derive(Args)]
pub struct IdArg {
    /// Item ID
    pub id: String,
}

#[derive(Args)]
pub struct AddArgs {
    /// New item ID
    pub id: String,
    /// Item description
    pub description: String,
    /// Parent item ID (default: a new root)
    #[arg(long)]
    pub parent: Option<String>,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Item ID
    pub id: String,
    /// New status (not_started, work_in_progress, completed)
    pub status: String,
}

#[derive(Args)]
pub struct SubstatusArgs {
    /// Item ID
    pub id: String,
    /// New substatus (modeled, quoted, drafted)
    pub substatus: String,
}

#[derive(Args)]
pub struct NoteArgs {
    /// Item ID
    pub id: String,
    /// Note text
    pub text: String,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Output file (default: <project>.json)
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Export file to import
    pub file: PathBuf,
}

// ---------------------------------------------------------------------------
// Calculator args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct CalcCmd {
    #[command(subcommand)]
    pub action: CalcAction,
}

#[derive(Subcommand)]
pub enum CalcAction {
    /// Pipe pressure drop (psi)
    PressureDrop(PressureDropArgs),
    /// Cylinder extension force (lbf)
    CylinderForce(CylinderForceArgs),
    /// Pump input power (hp)
    PumpPower(PumpPowerArgs),
    /// Convert a value between units
    Convert(ConvertArgs),
}

#[derive(Args)]
pub struct PressureDropArgs {
    /// Flow rate, GPM
    #[arg(long)]
    pub flow: f64,
    /// Pipe inner diameter, inches
    #[arg(long)]
    pub diameter: f64,
    /// Pipe length, feet
    #[arg(long)]
    pub length: f64,
    /// Fluid viscosity, cP
    #[arg(long)]
    pub viscosity: f64,
}

#[derive(Args)]
pub struct CylinderForceArgs {
    /// Bore diameter, inches
    #[arg(long)]
    pub bore: f64,
    /// System pressure, psi
    #[arg(long)]
    pub pressure: f64,
}

#[derive(Args)]
pub struct PumpPowerArgs {
    /// Flow rate, GPM
    #[arg(long)]
    pub flow: f64,
    /// Pressure, psi
    #[arg(long)]
    pub pressure: f64,
    /// Overall efficiency, percent
    #[arg(long, default_value_t = 85.0)]
    pub efficiency: f64,
}

#[derive(Args)]
pub struct ConvertArgs {
    /// Unit category (flow, pressure, force, power, length, torque)
    pub category: String,
    /// Value to convert
    pub value: f64,
    /// Source unit key
    pub from: String,
    /// Target unit key
    pub to: String,
}

// ---------------------------------------------------------------------------
// Parts args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct BomArgs {
    /// Old BOM file (`PART QTY` per line)
    pub old: PathBuf,
    /// New BOM file
    pub new: PathBuf,
    /// Multiply both sides' quantities
    #[arg(long, default_value_t = 1.0)]
    pub scale: f64,
    /// Rows to show (all, changed, added, removed, qty_change, unchanged)
    #[arg(long, default_value = "all")]
    pub filter: String,
}

#[derive(Args)]
pub struct LookupArgs {
    /// Part number wildcard (`*` and `?`)
    #[arg(long)]
    pub part: Option<String>,
    /// Description wildcard
    #[arg(long)]
    pub desc: Option<String>,
    /// Parts catalog file (overrides lookup.catalog)
    #[arg(long)]
    pub catalog: Option<PathBuf>,
}

#[derive(Args)]
pub struct FuzzyArgs {
    /// Free-text query
    pub query: String,
    /// Maximum number of results (default: lookup.fuzzy_limit)
    #[arg(long)]
    pub limit: Option<usize>,
    /// Parts catalog file (overrides lookup.catalog)
    #[arg(long)]
    pub catalog: Option<PathBuf>,
}
