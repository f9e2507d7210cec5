//! reelbase entry point
//!
//! All logic is delegated to the CLI module; this only reports the final
//! error and sets the exit code.

use reelbase::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
