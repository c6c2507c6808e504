use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docweave::cli::ChangeArgs;
use docweave::cli::commands::run::RunOptions;
use docweave::config::QualityMode;

#[derive(Parser)]
#[command(name = "docweave")]
#[command(
    version,
    about = "Keep repository documentation in step with code changes"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Use only this config file instead of the global/project chain
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(clap::Args)]
struct ChangeInput {
    #[arg(long, help = "Change description (JSON or YAML)")]
    change: PathBuf,
    #[arg(long, default_value = ".", help = "Repository checkout")]
    repo: PathBuf,
    #[arg(long, help = "Repository snapshot file, instead of scanning the checkout")]
    snapshot: Option<PathBuf>,
}

impl From<ChangeInput> for ChangeArgs {
    fn from(input: ChangeInput) -> Self {
        Self {
            change: input.change,
            repo: input.repo,
            snapshot: input.snapshot,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a change and show the documentation plan, without generating
    Plan {
        #[command(flatten)]
        input: ChangeInput,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json, yaml"
        )]
        format: String,
    },

    /// Run the full documentation orchestration for a change
    Run {
        #[command(flatten)]
        input: ChangeInput,
        #[arg(long, short, help = "Save the result (.md for a summary, otherwise JSON)")]
        output: Option<PathBuf>,
        #[arg(long, help = "Write accepted documents into the checkout")]
        write: bool,
        #[arg(long, requires = "write", help = "Also write partial documents")]
        include_partial: bool,
        #[arg(long, help = "Quality mode: fast, standard, deep")]
        mode: Option<QualityMode>,
        #[arg(long, help = "Pass threshold override (0.0-1.0)")]
        threshold: Option<f64>,
        #[arg(long, help = "Attempts per target, including the first")]
        max_attempts: Option<u32>,
        #[arg(long, help = "LLM provider (openai, ollama)")]
        provider: Option<String>,
        #[arg(long, help = "Model to use")]
        model: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mdocweave encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "docweave=debug,info"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let load_config = || docweave::cli::load_config(cli.config.as_deref());

    match cli.command {
        Commands::Plan { input, format } => {
            docweave::cli::commands::plan::run(&input.into(), load_config()?, &format)?;
        }
        Commands::Run {
            input,
            output,
            write,
            include_partial,
            mode,
            threshold,
            max_attempts,
            provider,
            model,
        } => {
            docweave::cli::commands::run::run(
                RunOptions {
                    change: input.into(),
                    output,
                    write,
                    include_partial,
                    mode,
                    threshold,
                    max_attempts,
                    provider,
                    model,
                },
                load_config()?,
            )?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => {
                docweave::cli::commands::config::show(&load_config()?, &format)?;
            }
            ConfigAction::Path => {
                docweave::cli::commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                docweave::cli::commands::config::init(global, force)?;
            }
        },
    }

    Ok(())
}
