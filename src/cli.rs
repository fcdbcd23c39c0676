// Command line surface. Parsing only; the bodies live in `commands`.

use crate::config::ClientConfig;
use crate::models::Importance;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const DEFAULT_LIST: &str = "Tasks";

/// Microsoft To Do from the terminal
#[derive(Parser, Debug)]
#[command(name = "mstodo")]
#[command(about = "Microsoft To Do from the terminal", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Show detailed information
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log at debug level and trace every API request and response to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(flatten)]
    pub client: ClientArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Who we sign in as and where things are kept.
#[derive(Args, Debug, Clone, Default)]
pub struct ClientArgs {
    /// Application (client) id registered for device-code sign in
    #[arg(long, env = "MSTODO_CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    /// Tenant to sign in against (common, organizations, or a tenant id)
    #[arg(long, env = "MSTODO_TENANT", global = true)]
    pub tenant: Option<String>,

    /// Token cache file
    #[arg(long, env = "MSTODO_CACHE_FILE", global = true)]
    pub cache_file: Option<PathBuf>,

    #[arg(long, env = "MSTODO_AUTHORITY_HOST", global = true, hide = true)]
    pub authority_host: Option<String>,

    #[arg(long, env = "MSTODO_GRAPH_ENDPOINT", global = true, hide = true)]
    pub graph_endpoint: Option<String>,
}

impl ClientArgs {
    /// Overrides applied on top of `base`.
    pub fn apply(self, base: ClientConfig) -> ClientConfig {
        let mut config = base;
        if let Some(client_id) = self.client_id {
            config = config.with_client_id(client_id);
        }
        if let Some(tenant) = self.tenant {
            config = config.with_tenant(tenant);
        }
        if let Some(path) = self.cache_file {
            config = config.with_cache_file(path);
        }
        if let Some(host) = self.authority_host {
            config = config.with_authority_host(host);
        }
        if let Some(endpoint) = self.graph_endpoint {
            config = config.with_graph_endpoint(endpoint);
        }
        config
    }

    pub fn into_config(self) -> ClientConfig {
        self.apply(ClientConfig::from_env())
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List all task lists
    Lists,

    /// List tasks in a list
    Tasks {
        /// List name
        list: String,

        /// Include completed tasks
        #[arg(short, long)]
        all: bool,
    },

    /// Add a new task
    Add {
        /// Task title
        title: String,

        /// List name
        #[arg(short, long, default_value = DEFAULT_LIST)]
        list: String,

        /// Due date: a number of days from now, or a date
        #[arg(short, long)]
        due: Option<String>,

        /// Priority
        #[arg(short, long, value_enum, default_value_t = Importance::Normal)]
        priority: Importance,

        /// Task description
        #[arg(short = 'D', long)]
        description: Option<String>,

        /// Tags (comma separated)
        #[arg(short, long)]
        tags: Option<String>,

        /// Create the list if it does not exist
        #[arg(long)]
        create_list: bool,
    },

    /// Mark a task as completed
    Complete {
        /// Task title
        title: String,

        /// List name
        #[arg(short, long, default_value = DEFAULT_LIST)]
        list: String,
    },

    /// Delete a task
    Delete {
        /// Task title
        title: String,

        /// List name
        #[arg(short, long, default_value = DEFAULT_LIST)]
        list: String,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// View task details
    Detail {
        /// Task title (partial match)
        title: String,

        /// List name
        #[arg(short, long, default_value = DEFAULT_LIST)]
        list: String,
    },

    /// Search tasks by title and notes
    Search {
        /// Search keyword
        keyword: String,
    },

    /// Tasks due today
    Today,

    /// Overdue tasks
    Overdue,

    /// All incomplete tasks
    Pending {
        /// Group by list
        #[arg(short, long)]
        group: bool,
    },

    /// Statistics
    Stats,

    /// Export all tasks to a JSON file
    Export {
        /// Output file
        #[arg(short, long, default_value = "todo_export.json")]
        output: PathBuf,
    },

    /// Create a new list
    CreateList {
        /// List name
        name: String,
    },

    /// Delete a list and all its tasks
    DeleteList {
        /// List name
        name: String,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Sign in with a device code
    Login {
        #[command(subcommand)]
        action: Option<LoginAction>,
    },

    /// Sign out and clear the token cache
    Logout,
}

impl Command {
    /// Sign-in management runs without a token.
    pub fn needs_auth(&self) -> bool {
        !matches!(self, Command::Login { .. } | Command::Logout)
    }
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginAction {
    /// Get a verification code and the sign-in link
    Get,
    /// Wait for the code to be entered and finish signing in
    Verify,
}
