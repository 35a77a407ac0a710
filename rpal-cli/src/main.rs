use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use app::App;
use clap::{ArgAction, Parser, Subcommand};
use rpal::Tree;
use rpal::config::{BuiltinPolicy, Config, UnboundPolicy, load_config};
use rpal::execution_trace::trace_program;
use rpal::program::load_program_from_file;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod app;
mod utils;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
    /// Raise the log level (-v info, -vv debug, -vvv trace). RUST_LOG wins.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Fail on unbound names and misused built-ins.
    #[arg(long, global = true, env = "RPAL_STRICT")]
    strict: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate a program and print its answer
    Run {
        file: PathBuf,
        /// Print the parsed tree instead of evaluating
        #[clap(long)]
        ast: bool,
        /// Print the standardized tree instead of evaluating
        #[clap(long)]
        st: bool,
    },
    /// Print every machine state as JSON
    Trace {
        file: PathBuf,
        #[clap(long)]
        max_frames: Option<usize>,
    },
    /// Step through a program in the terminal
    Debug {
        file: PathBuf,
        #[clap(long)]
        max_frames: Option<usize>,
    },
}

fn main() -> Result<()> {
    utils::install_hooks().map_err(|err| anyhow!("could not install terminal hooks: {err}"))?;

    let args = Args::parse();
    init_logging(args.verbose);

    let mut config: Config = load_config().extract().context("invalid configuration")?;
    if args.strict {
        config.unbound = UnboundPolicy::Strict;
        config.builtins = BuiltinPolicy::Strict;
    }
    debug!(?config, "loaded configuration");

    match args.command {
        Some(Commands::Run { file, ast, st }) => {
            let loaded = load_program_from_file(&file)?;
            if ast {
                print!("{}", loaded.tree);
            }
            if ast || st {
                if st {
                    print!("{}", loaded.standardized()?);
                }
                return Ok(());
            }
            let tree = loaded.standardized()?;
            let value = rpal::evaluate(&tree, &config, io::stdout())
                .with_context(|| format!("error while running {}", file.display()))?;
            let answer = value.answer();
            if !answer.is_empty() {
                println!("{answer}");
            }
            Ok(())
        }
        Some(Commands::Trace { file, max_frames }) => {
            if let Some(max_frames) = max_frames {
                config.trace.max_frames = max_frames;
            }
            let tree = standardized(&file)?;
            let trace = trace_program(&tree, &config)?;
            println!("{}", serde_json::to_string_pretty(&trace)?);
            if let Some(error) = trace.error {
                bail!("error while running {}: {error}", file.display());
            }
            Ok(())
        }
        Some(Commands::Debug { file, max_frames }) => {
            if let Some(max_frames) = max_frames {
                config.trace.max_frames = max_frames;
            }
            let tree = standardized(&file)?;
            let trace = trace_program(&tree, &config)?;

            let mut terminal = utils::init()?;
            let mut app = App {
                file_name: file,
                tree: tree.to_string(),
                frames: trace.frames,
                answer: trace.answer,
                error: trace.error,
                truncated: trace.truncated,
                ..Default::default()
            };
            let app_result = app.run(&mut terminal);
            utils::restore().and(app_result)?;
            Ok(())
        }
        None => {
            println!("No command provided");
            Ok(())
        }
    }
}

fn standardized(file: &Path) -> Result<Tree> {
    load_program_from_file(file)?.standardized()
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
