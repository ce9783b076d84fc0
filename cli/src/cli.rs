use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

/// Headless front end for a studio backend.
#[derive(Parser, Debug, Clone)]
#[command(version, name = "studio")]
pub struct Cli {
    /// Backend base URL, e.g. `http://localhost:5050`. Overrides
    /// `STUDIO_API_BASE` and the config file.
    #[arg(long = "api-base", global = true, value_name = "URL")]
    pub api_base: Option<String>,

    /// Config file to read instead of `~/.studio/config.toml`.
    #[arg(long = "config", global = true, value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Probe the backend health endpoint.
    Health {
        /// Keep polling at the configured interval until interrupted.
        #[arg(long, default_value_t = false)]
        watch: bool,
    },

    /// List a directory.
    Ls {
        /// Directory relative to the project root; the root when omitted.
        path: Option<String>,
    },

    /// Fuzzy-find files by path, quick-open style.
    Find {
        query: String,

        /// Maximum number of results.
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Send one prompt to the agent and stream the reply.
    Chat {
        prompt: String,

        /// Chat session id.
        #[arg(long)]
        session: Option<String>,
    },

    /// Attach stdin/stdout to the backend terminal (line mode).
    Terminal,

    /// Run the project's tests.
    Test,

    /// Full-text search across the project.
    Search { query: String },
}
