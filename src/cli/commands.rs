use clap::{ArgGroup, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "th", about = concat!("task hero v", env!("CARGO_PKG_VERSION"), " - tasks from your task store"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Task store base URL (overrides config and TASK_HERO_API_BASE_URL)
    #[arg(long = "api-url", global = true)]
    pub api_url: Option<String>,

    /// Path to a config file (default: ./task-hero.toml if present)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Log more (repeat for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List tasks, optionally filtered
    List(ListArgs),
    /// Show task details
    Show(ShowArgs),
    /// Create a task
    Add(AddArgs),
    /// Edit a task
    Update(UpdateArgs),
    /// Flip a task between complete and incomplete
    Toggle(ToggleArgs),
    /// Delete a task
    Delete(DeleteArgs),
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ListArgs {
    /// Only tasks whose title or detail contains this text
    pub text: Option<String>,
    /// Include complete tasks
    #[arg(long)]
    pub complete: bool,
    /// Include incomplete tasks
    #[arg(long)]
    pub incomplete: bool,
    /// Include overdue tasks
    #[arg(long)]
    pub overdue: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Task ID to show
    pub id: String,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Task title (at least 2 characters)
    pub title: String,
    /// Longer description
    #[arg(long)]
    pub detail: Option<String>,
    /// Due date, ISO 8601 (e.g. 2025-06-01 or 2025-06-01T17:00:00Z)
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Args)]
#[command(group(ArgGroup::new("completion").args(["complete", "incomplete"])))]
pub struct UpdateArgs {
    /// Task ID to edit
    pub id: String,
    /// New title
    #[arg(long)]
    pub title: Option<String>,
    /// New description (empty string keeps the current one)
    #[arg(long)]
    pub detail: Option<String>,
    /// New due date (empty string keeps the current one)
    #[arg(long)]
    pub due: Option<String>,
    /// Mark complete
    #[arg(long)]
    pub complete: bool,
    /// Mark incomplete
    #[arg(long)]
    pub incomplete: bool,
}

#[derive(Args)]
pub struct ToggleArgs {
    /// Task ID to toggle
    pub id: String,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Task ID to delete
    pub id: String,
}
