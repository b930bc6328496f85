mod cli;
mod controller;
mod paths;
mod run;
mod script;

use anyhow::Result;

use crate::cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();
    match cli.command {
        Some(Command::Export(args)) => run::run_export(cli.run, args),
        Some(Command::Gallery(args)) => run::list_gallery(cli.run, args),
        Some(Command::Where) => run::print_where(),
        None => run::run_window(cli.run),
    }
}
