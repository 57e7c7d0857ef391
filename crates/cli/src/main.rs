mod filelist;
mod project;
mod terminal;
mod wizard;

use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use waymark_core::{TourConfig, WizardError};

use terminal::TerminalConsole;

/// Waymark interactive project wizard.
#[derive(Parser)]
#[command(name = "waymark", version, about = "Waymark interactive project wizard")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new project by answering the wizard's questions
    New {
        /// Echo every answer and show the question tree before each step
        #[arg(long)]
        trace: bool,
        /// Print the collected answers as JSON before each step
        #[arg(long)]
        debug_state: bool,
        /// TOML file with wizard settings (validation and interrupt limits)
        #[arg(long)]
        settings: Option<PathBuf>,
    },

    /// Print the wizard's question tree without asking anything
    Tree,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::New {
            trace,
            debug_state,
            settings,
        } => {
            let mut config = match settings {
                Some(path) => match TourConfig::load(&path) {
                    Ok(config) => config,
                    Err(e) => {
                        eprintln!("error: {}", e);
                        process::exit(1);
                    }
                },
                None => TourConfig::default(),
            };
            config.trace |= trace;
            config.debug_state |= debug_state;
            cmd_new(config);
        }
        Commands::Tree => cmd_tree(),
    }
}

fn cmd_new(config: TourConfig) {
    let mut tour = match wizard::project_tour(config) {
        Ok(tour) => tour,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupt_flag = Arc::clone(&interrupted);
    if let Err(e) = ctrlc::set_handler(move || {
        interrupt_flag.store(true, Ordering::SeqCst);
    }) {
        tracing::warn!(error = %e, "could not install the Ctrl-C handler");
    }
    let mut console = TerminalConsole::stdio(interrupted);

    match tour.run(&mut console) {
        Ok(()) => {}
        // Already explained on the console.
        Err(WizardError::TooManyFailures { .. }) | Err(WizardError::Aborted(_)) => process::exit(1),
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

fn cmd_tree() {
    match wizard::project_tour(TourConfig::default()) {
        Ok(tour) => println!("{}", tour.render(None)),
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}
