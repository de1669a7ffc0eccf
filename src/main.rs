use std::process::ExitCode;

use ccsync::cli::{self, Cli};
use ccsync::ui::output;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    cli::init_tracing(cli.debug, cli.quiet);

    match cli::run_with(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
