use actionkit::Action;
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "infragraph")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Infer, diff, qualify and provision an infrastructure entity graph", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Infer entity properties from related entities
    Infer(InferArgs),

    /// Show property changes between two graphs
    Diff(DiffArgs),

    /// Run qualification checks against a graph
    Qualify(QualifyArgs),

    /// Run a provisioning action against one entity
    Apply(ApplyArgs),

    /// Run configured workflows
    #[command(subcommand)]
    Workflow(WorkflowCommand),

    /// Inspect persisted resource state
    #[command(subcommand)]
    State(StateCommand),

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Graph Commands
// ============================================================================

#[derive(Debug, clap::Args)]
pub struct InferArgs {
    /// Graph file (JSON or TOML)
    pub graph: PathBuf,

    /// System to render (defaults to the configured one)
    #[arg(short, long)]
    pub system: Option<String>,

    /// Number of parallel inference jobs
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,

    /// Upper bound on inference passes
    #[arg(long, default_value = "8")]
    pub max_passes: usize,

    /// Print the inferred graph as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Args)]
pub struct DiffArgs {
    /// Graph before the change
    pub baseline: PathBuf,

    /// Graph after the change
    pub proposed: PathBuf,

    /// Infer both graphs before comparing
    #[arg(long)]
    pub infer: bool,

    /// Only show this entity (id or name)
    #[arg(short, long)]
    pub entity: Option<String>,

    /// Print the diff as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, clap::Args)]
pub struct QualifyArgs {
    /// Graph file (JSON or TOML)
    pub graph: PathBuf,

    /// System to qualify (defaults to the configured one)
    #[arg(short, long)]
    pub system: Option<String>,

    /// Only qualify this entity (id or name)
    #[arg(short, long)]
    pub entity: Option<String>,

    /// Per-check timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,
}

#[derive(Debug, clap::Args)]
pub struct ApplyArgs {
    /// Graph file (JSON or TOML)
    pub graph: PathBuf,

    /// Entity id or name
    pub entity: String,

    /// Action to run
    #[arg(short, long, value_enum)]
    pub action: ActionArg,

    /// System whose property values are used
    #[arg(short, long)]
    pub system: Option<String>,

    /// Skip the confirmation prompt for delete
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ActionArg {
    Create,
    Update,
    Delete,
}

impl From<ActionArg> for Action {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Create => Action::Create,
            ActionArg::Update => Action::Update,
            ActionArg::Delete => Action::Delete,
        }
    }
}

// ============================================================================
// Workflow, State and Config Commands
// ============================================================================

#[derive(Debug, Subcommand)]
pub enum WorkflowCommand {
    /// Run a workflow by id
    Run {
        /// Workflow id
        id: i64,

        /// Change set the run belongs to
        #[arg(long)]
        change_set: Option<i64>,

        /// Edit session inside the change set
        #[arg(long, requires = "change_set")]
        edit_session: Option<i64>,

        /// Graph providing the components the steps act on
        #[arg(short, long)]
        graph: Option<PathBuf>,

        /// Remote API root; runs locally when unset
        #[arg(long, env = "INFRAGRAPH_ENDPOINT")]
        endpoint: Option<String>,
    },

    /// List configured workflows
    List,
}

#[derive(Debug, Subcommand)]
pub enum StateCommand {
    /// Show provisioned resources and workflow runs
    Show,

    /// Forget all recorded resources and runs
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Print the config directory path
    Dir,
}
