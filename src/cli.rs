//! §10.5 CLI & process bootstrap.

use clap::{Parser, Subcommand};

#[derive(Parser, Clone)]
pub struct SharedOpts {
    #[clap(short, long, help = "Configuration file")]
    pub config: Option<String>,
    #[clap(short, long)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the server (default).
    Serve {
        #[clap(flatten)]
        sopt: SharedOpts,
    },
    /// Load and validate configuration, then exit.
    ConfigCheck {
        #[clap(flatten)]
        sopt: SharedOpts,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Serve { sopt: SharedOpts { config: None, debug: false } }
    }
}

#[derive(Parser)]
#[command(arg_required_else_help(false))]
/// The LDP + Memento + WebAC request-handling core, served over HTTP.
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn command(&self) -> Commands {
        match &self.command {
            Some(Commands::Serve { sopt }) => Commands::Serve { sopt: sopt.clone() },
            Some(Commands::ConfigCheck { sopt }) => Commands::ConfigCheck { sopt: sopt.clone() },
            None => Commands::default(),
        }
    }

    pub fn config_path(&self) -> Option<String> {
        match self.command() {
            Commands::Serve { sopt } | Commands::ConfigCheck { sopt } => sopt.config,
        }
    }

    pub fn debug(&self) -> bool {
        match self.command() {
            Commands::Serve { sopt } | Commands::ConfigCheck { sopt } => sopt.debug,
        }
    }
}
