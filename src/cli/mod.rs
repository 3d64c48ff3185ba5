// CLI module
// Command-line arguments of the server and the client

mod args;

pub use args::{CliArgs, ClientArgs, LogLevel};

use clap::Parser;

/// Parse the server's command-line arguments
///
/// On invalid arguments or `--help`, clap prints the message and exits.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}

/// Parse the client's command-line arguments
pub fn parse_client_args() -> ClientArgs {
    ClientArgs::parse()
}
