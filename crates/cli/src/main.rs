// crates/cli/src/main.rs
//! `faustus` command-line front end.
//!
//! Builds the store configuration once, installs logging, and hands each
//! subcommand to [`commands`].

mod commands;
mod resolve;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use faustus_core::{StorePaths, DEFAULT_PREVIEW_MESSAGES};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "FAUSTUS_LOG";

#[derive(Parser)]
#[command(name = "faustus", version, about = "Browse, search, and reorganize Claude Code sessions")]
struct Cli {
    /// Claude configuration directory (defaults to $CLAUDE_CONFIG_DIR, then ~/.claude)
    #[arg(long, global = true, value_name = "DIR")]
    claude_dir: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List sessions, newest first
    List {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Only sessions whose summary, prompt, project, or branch contain this
        #[arg(short, long)]
        query: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Search the contents of every transcript
    Search {
        query: String,
        #[command(flatten)]
        scope: ScopeArgs,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show the most recent messages of a session
    Preview {
        session_id: String,
        /// Number of messages to show
        #[arg(short = 'n', long, default_value_t = DEFAULT_PREVIEW_MESSAGES)]
        limit: usize,
        /// Highlight messages containing this text
        #[arg(short, long)]
        find: Option<String>,
    },
    /// Move a session to the trash
    Trash { session_id: String },
    /// Move a session back out of the trash
    Restore { session_id: String },
    /// Delete a session permanently
    Delete { session_id: String },
    /// Delete everything in the trash
    EmptyTrash,
    /// Set a session's summary
    Rename { session_id: String, summary: String },
    /// Move a session to the project for another working directory
    Reassign { session_id: String, new_path: String },
    /// Move every session recorded under one working directory to another
    ReassignAll { old_path: String, new_path: String },
}

#[derive(Args, Clone, Copy)]
#[group(multiple = false)]
struct ScopeArgs {
    /// Only sessions in the trash
    #[arg(long)]
    trash: bool,
    /// Active and trashed sessions
    #[arg(long)]
    all: bool,
}

impl ScopeArgs {
    fn scope(self) -> faustus_search::SessionScope {
        use faustus_search::SessionScope;
        match (self.trash, self.all) {
            (true, _) => SessionScope::Trash,
            (_, true) => SessionScope::All,
            _ => SessionScope::Active,
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let paths = match cli.claude_dir {
        Some(dir) => StorePaths::new(dir),
        None => StorePaths::discover()?,
    };
    let ctx = commands::Context::new(paths);

    match cli.command {
        Command::List { scope, query, json } => ctx.list(scope.scope(), query.as_deref(), json),
        Command::Search { query, scope, json } => ctx.search(&query, scope.scope(), json),
        Command::Preview {
            session_id,
            limit,
            find,
        } => ctx.preview(&session_id, limit, find.as_deref()),
        Command::Trash { session_id } => ctx.trash(&session_id),
        Command::Restore { session_id } => ctx.restore(&session_id),
        Command::Delete { session_id } => ctx.delete(&session_id),
        Command::EmptyTrash => ctx.empty_trash(),
        Command::Rename {
            session_id,
            summary,
        } => ctx.rename(&session_id, &summary),
        Command::Reassign {
            session_id,
            new_path,
        } => ctx.reassign(&session_id, &new_path),
        Command::ReassignAll { old_path, new_path } => ctx.reassign_all(&old_path, &new_path),
    }
}
