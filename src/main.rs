//! Binary entrypoint that launches the terminal chat.

use std::process::ExitCode;

use pocketchat::start_pocketchat;

/// Run the terminal chat until the user quits.
fn main() -> ExitCode {
    start_pocketchat::run()
}
