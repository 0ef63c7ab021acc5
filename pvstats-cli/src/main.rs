//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use pvstats_cli::CliError;

#[expect(
    clippy::print_stderr,
    reason = "fatal errors are reported on stderr before exiting"
)]
fn main() {
    if let Err(err) = pvstats_cli::run() {
        if let CliError::ArgumentParsing(parse) = &err {
            parse.exit();
        }
        eprintln!("pvstats: {err}");
        std::process::exit(1);
    }
}
