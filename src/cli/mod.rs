//! CLI argument parsing using clap 4.x derive macros

use clap::{Parser, Subcommand};
use sleuth_core::config::{Config, SearchProvider};
use std::path::PathBuf;

/// Research assistant that answers questions with live web search
///
/// Runs an interactive session by default; follow-up questions reuse the
/// conversation so far. Keys are read from the environment or a `.env` file.
#[derive(Parser, Debug)]
#[command(name = "sleuth")]
#[command(author, about, long_about = None)]
#[command(disable_version_flag = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file (defaults to ./sleuth.yaml, then the user config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Anthropic model id
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Maximum reason/act steps per question
    #[arg(long, global = true, value_parser = clap::value_parser!(usize))]
    pub max_iterations: Option<usize>,

    /// Search backend (serper or duckduckgo)
    #[arg(long, global = true)]
    pub provider: Option<SearchProvider>,

    /// Mirror debug log lines to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print version information
    #[arg(long)]
    pub version: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a single question and exit
    Ask {
        /// The question to research
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Show the resolved configuration (keys masked)
    Config,
}

impl Cli {
    /// Command-line flags win over file and environment values
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(n) = self.max_iterations {
            config.agent.max_iterations = n;
        }
        if let Some(provider) = self.provider {
            config.web_search.provider = provider;
        }
        if self.verbose {
            config.verbose = true;
        }
    }
}
