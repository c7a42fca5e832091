//! spk - Command-line tool for unpacking and repacking sprite atlases

use std::process::ExitCode;

use spritepack::cli;

fn main() -> ExitCode {
    cli::run()
}
