//! Command-line interface for codebee.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Codebee - collaborative code-writing game server
#[derive(Parser, Debug)]
#[command(name = "codebee")]
#[command(about = "Turn-based code-writing game for humans and LLM bots", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP game server with its bot worker
    Serve {
        /// Path to a TOML engine configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Path to the database file (created if it doesn't exist)
        #[arg(long, default_value = "codebee.db")]
        db_path: String,

        /// Keep all state in memory instead of a database file
        #[arg(long, conflicts_with = "db_path")]
        memory: bool,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// `node` binary used to score finished games
        #[arg(long)]
        node: Option<PathBuf>,
    },

    /// Add a problem from a TOML file
    AddProblem {
        /// Path to the database file
        #[arg(long, default_value = "codebee.db")]
        db_path: String,

        /// Problem file with `prompt`, `summary` and `testCases`
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Print every state of a game, replayed from its input log
    Playback {
        /// Path to the database file
        #[arg(long, default_value = "codebee.db")]
        db_path: String,

        /// Game to replay
        #[arg(long)]
        game_id: i64,
    },
}
