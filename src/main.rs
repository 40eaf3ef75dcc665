// src/main.rs

use localflow::cli::{self, LogLevel};
use localflow::config::loader::load_config;
use localflow::logging::init_logging;

fn main() {
    let args = cli::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("localflow error: {err}");
            std::process::exit(1);
        }
    };

    let cli_level = if args.debug {
        Some(LogLevel::Debug)
    } else {
        args.log_level
    };
    if let Err(err) = init_logging(cli_level, &config.log_level) {
        eprintln!("localflow error: failed to initialise logging: {err}");
        std::process::exit(1);
    }

    if let Err(err) = localflow::run(args, config) {
        eprintln!("localflow error: {err}");
        std::process::exit(1);
    }
}
