use pipemon::cli;
use pipemon_common::{error_message, Colorize};

pub fn main() {
    if let Err(e) = cli::process_command() {
        error_message!("{:#}", e);
        std::process::exit(1);
    }
}
