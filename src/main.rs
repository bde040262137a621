//! Binary entry point: logger setup, argument parsing, one factorization
//! run, and the printed reconstruction.

use std::env;
use std::process;

use log::LevelFilter;

use sparse_mf::config::Config;

fn setup_logger() -> Result<(), fern::InitError> {
    // Configure the logger
    fern::Dispatch::new()
        // Format the logs
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        // Set the default log level
        .level(LevelFilter::Info)
        // Add stdout logging
        .chain(std::io::stdout())
        // Add file logging
        .chain(fern::log_file("output.log")?)
        // Apply the configuration
        .apply()?;
    Ok(())
}

fn main() {
    setup_logger().expect("Failed to initialize logger");

    let config = Config::new(env::args()).unwrap_or_else(|err| {
        eprintln!("Problem parsing arguments: {}", err);
        eprintln!("Usage: sparse_mf <ratings-file> <rank> <steps> <alpha> <beta>");
        process::exit(1);
    });

    match sparse_mf::run(&config) {
        Ok(result) => {
            // full dense reconstruction, unobserved cells included
            println!("{}", result.predict());
        }
        Err(err) => {
            eprintln!("Factorization failed: {}", err);
            process::exit(1);
        }
    }
}
