use std::io;
use std::process::ExitCode;

use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use git_stage_lines::{DEFAULT_CONTEXT_LINES, LineStager, StageError};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "git-stage-lines")]
#[command(about = "Stage selected lines of a file into the git index")]
#[command(version)]
struct Cli {
    /// Run as if git was started in this directory
    #[arg(short = 'C', value_name = "PATH", default_value = ".", global = true)]
    repo: String,

    /// Context lines around each staged change
    #[arg(short = 'U', long = "unified", value_name = "N", default_value_t = DEFAULT_CONTEXT_LINES, global = true)]
    context: usize,

    /// More log output (repeat for more)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage lines by selection (e.g., src/main.rs:10..15)
    Stage {
        /// File and working-tree lines (e.g., "flake.nix:137" or "flake.nix:10..15")
        #[arg(required = true)]
        selections: Vec<String>,
    },
    /// Print the patch a selection would stage, without staging it
    Patch {
        /// File and working-tree lines
        selection: String,
    },
    /// Show unstaged changes with line numbers
    Diff {
        /// Limit to these files
        files: Vec<String>,
    },
    /// Generate shell completions
    Completions {
        shell: Shell,
    },
    /// Generate a man page
    Man,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(stager: &LineStager, command: Commands) -> Result<(), StageError> {
    match command {
        Commands::Stage { selections } => {
            for selection in &selections {
                stager.stage(selection)?;
            }
        }
        Commands::Patch { selection } => print!("{}", stager.patch(&selection)?),
        Commands::Diff { files } => println!("{}", stager.diff(&files)?),
        Commands::Completions { .. } | Commands::Man => {}
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "git-stage-lines", &mut io::stdout());
            return ExitCode::SUCCESS;
        }
        Commands::Man => {
            return match clap_mangen::Man::new(Cli::command()).render(&mut io::stdout()) {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    eprintln!("error: {err}");
                    ExitCode::FAILURE
                }
            };
        }
        _ => {}
    }

    let stager = LineStager::new(&cli.repo).with_context_lines(cli.context);
    match run(&stager, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is_nothing_to_stage() => {
            eprintln!("nothing to stage: {err}");
            ExitCode::from(2)
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
