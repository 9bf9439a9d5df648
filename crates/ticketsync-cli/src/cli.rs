use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use ticketsync_core::TicketStatus;

#[derive(Parser)]
#[command(name = "tix")]
#[command(about = "Offline-first ticket board for the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub global: GlobalOptions,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Ticket API base URL (overrides config and TICKETSYNC_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Work offline: never contact the ticket API
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new ticket
    #[command(alias = "new")]
    Add {
        /// Ticket title
        title: Vec<String>,
        /// Longer description (defaults to the title)
        #[arg(short, long)]
        description: Option<String>,
        /// Initial status
        #[arg(short, long, value_enum, default_value_t = StatusArg::Todo)]
        status: StatusArg,
    },
    /// List tickets
    #[command(alias = "ls")]
    List {
        /// Only show tickets with this status
        #[arg(short, long, value_enum)]
        status: Option<StatusArg>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show tickets grouped by status
    Board,
    /// Edit a ticket (opens $EDITOR on the description when no field is given)
    Edit {
        /// Ticket ID or unique ID prefix
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long, value_enum)]
        status: Option<StatusArg>,
    },
    /// Move a ticket to another column
    #[command(alias = "mv")]
    Move {
        /// Ticket ID or unique ID prefix
        id: String,
        /// Target status
        #[arg(value_enum)]
        status: StatusArg,
    },
    /// Delete a ticket from this device (the server copy is kept)
    #[command(alias = "rm")]
    Delete {
        /// Ticket ID or unique ID prefix
        id: String,
    },
    /// Push local changes and pull the server's tickets
    Sync,
    /// Show sync status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum StatusArg {
    Todo,
    #[value(name = "in_progress", alias = "in-progress", alias = "doing")]
    InProgress,
    Done,
}

impl From<StatusArg> for TicketStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Todo => Self::Todo,
            StatusArg::InProgress => Self::InProgress,
            StatusArg::Done => Self::Done,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
