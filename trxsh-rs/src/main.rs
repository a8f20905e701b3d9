mod logging;
mod picker;

use clap::{ArgGroup, CommandFactory, Parser};
use picker::{FzfPicker, Picker};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use trxsh_core::prelude::*;
use trxsh_core::{print_size, sanitize_user_path};

#[derive(Debug, Parser)]
#[command(name = "trxsh", version, about = "Move files to a recoverable trash", long_about = None)]
#[command(group(
    ArgGroup::new("action").args(["fzf", "list", "restore", "cleanup", "dir_sizes", "files"])
))]
struct Cli {
    /// Restore files using fzf
    #[arg(short = 'f', long)]
    fzf: bool,

    /// List files in trash
    #[arg(short, long)]
    list: bool,

    /// Restore files by ID
    #[arg(short, long, value_name = "ID", num_args = 1..)]
    restore: Vec<u64>,

    /// Empty all trash directories
    #[arg(short, long)]
    cleanup: bool,

    /// Show directory sizes
    #[arg(short = 's', long = "dir-sizes")]
    dir_sizes: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Files or directories to move to the trash
    files: Vec<PathBuf>,
}

impl Cli {
    fn action(&self) -> Option<CommandKind> {
        if self.fzf {
            Some(CommandKind::Pick)
        } else if self.list {
            Some(CommandKind::List)
        } else if !self.restore.is_empty() {
            Some(CommandKind::Restore)
        } else if self.cleanup {
            Some(CommandKind::Cleanup)
        } else if self.dir_sizes {
            Some(CommandKind::Sizes)
        } else if !self.files.is_empty() {
            Some(CommandKind::Trash)
        } else {
            None
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let Some(kind) = cli.action() else {
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    };

    debug!(command = %kind, "dispatching");
    match run(kind, &cli) {
        Ok(status) => ExitCode::from(status.as_code()),
        Err(err) => {
            eprintln!("trxsh {kind}: {err}");
            ExitCode::from(ExitStatusLike::Error.as_code())
        }
    }
}

fn run(kind: CommandKind, cli: &Cli) -> Result<ExitStatusLike> {
    let mut can = TrashCan::open(Config::from_env()?)?;

    match kind {
        CommandKind::Trash => {
            let report = can.trash(&cli.files)?;
            print_batch(&report);
            Ok(report.exit_status())
        }
        CommandKind::List => {
            if can.list().is_empty() {
                println!("No files in trash");
            }
            for record in can.list() {
                println!("{record}");
            }
            Ok(ExitStatusLike::Ok)
        }
        CommandKind::Restore => {
            let report = can.restore_many(&cli.restore);
            print_batch(&report);
            Ok(report.exit_status())
        }
        CommandKind::Pick => {
            if can.list().is_empty() {
                println!("No files in trash");
                return Ok(ExitStatusLike::Ok);
            }
            if let Some(id) = FzfPicker::locate()?.pick(can.list())? {
                let record = can.restore(id)?;
                println!("Restored to: {}", sanitize_user_path(&record.path));
            }
            Ok(ExitStatusLike::Ok)
        }
        CommandKind::Cleanup => {
            can.cleanup()?;
            println!("Trash emptied");
            Ok(ExitStatusLike::Ok)
        }
        CommandKind::Sizes => {
            for (name, size) in can.report_sizes().sizes() {
                println!("{name} ({})", print_size(size));
            }
            Ok(ExitStatusLike::Ok)
        }
    }
}

fn print_batch(report: &BatchReport) {
    for outcome in &report.outcomes {
        match outcome {
            ItemOutcome::Trashed { id, source, .. } => {
                println!("{id}: {}", sanitize_user_path(source));
            }
            ItemOutcome::Restored { path, .. } => {
                println!("Restored to: {}", sanitize_user_path(path));
            }
            ItemOutcome::Skipped { path, reason } => match reason {
                SkipReason::MissingPath(_) => eprintln!("File not found: {}", sanitize_user_path(path)),
                SkipReason::AlreadyTrashed(_) => eprintln!("Already in trash: {}", sanitize_user_path(path)),
            },
            ItemOutcome::Failed { target, error } => eprintln!("trxsh: {target}: {error}"),
        }
    }
}
