//! Main application entry point.

use clap::Parser;
use defectmark_app::{App, Args};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();
    let config = defectmark_app::load_config(args.config.as_deref());
    defectmark_app::init_logging(config.as_ref().ok());
    log::info!("Starting DefectMark");

    let result = config.and_then(|config| pollster::block_on(App::new(args, config).run()));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
