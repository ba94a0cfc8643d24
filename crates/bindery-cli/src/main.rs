//! `bindery` — resolve annotated declaration files and report diagnostics.

use bindery_schema::resolve::{Resolution, resolve};
use clap::{Parser, Subcommand};
use std::{
    fs,
    path::PathBuf,
    process::ExitCode,
};

#[derive(Parser)]
#[command(name = "bindery", about = "Schema binding resolver")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve the given declaration files and print every diagnostic.
    Check {
        /// Declaration documents (JSON), resolved together as one set.
        #[arg(long = "path", required = true, num_args = 1..)]
        paths: Vec<PathBuf>,
    },

    /// Resolve and emit the resolved metadata model as JSON.
    Dump {
        #[arg(long = "path", required = true, num_args = 1..)]
        paths: Vec<PathBuf>,

        /// Write the model here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Check { paths } => check(&paths).map(|_| ()),
        Command::Dump { paths, output } => dump(&paths, output.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            if let Some(message) = failure {
                eprintln!("{message}");
            }

            ExitCode::FAILURE
        }
    }
}

// Err(Some(..)) is a hard failure with a message; Err(None) means the
// diagnostics were already printed.
type Failure = Option<String>;

fn check(paths: &[PathBuf]) -> Result<Resolution, Failure> {
    let set = bindery_load::load_paths(paths).map_err(|err| Some(err.to_string()))?;
    let resolution = resolve(&set);

    for diagnostic in resolution.diagnostics.flatten() {
        eprintln!("{diagnostic}");
    }

    // The diagnostics were already printed one per line.
    resolution.into_result().map_err(|_| None)
}

fn dump(paths: &[PathBuf], output: Option<&std::path::Path>) -> Result<(), Failure> {
    let resolution = check(paths)?;

    let model = serde_json::to_string_pretty(&resolution)
        .map_err(|err| Some(format!("cannot serialize the model: {err}")))?;

    match output {
        Some(path) => fs::write(path, model)
            .map_err(|err| Some(format!("cannot write '{}': {err}", path.display())))?,
        None => println!("{model}"),
    }

    Ok(())
}
