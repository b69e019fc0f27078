use std::process::ExitCode;

use trigon_engine::device::RendererInit;
use trigon_engine::logging::{init_logging, LoggingConfig};
use trigon_engine::window::{Runtime, RuntimeConfig};

mod report;

fn main() -> ExitCode {
    init_logging(LoggingConfig::default());

    match Runtime::run(RuntimeConfig::default(), RendererInit::default()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report::fatal(&err);
            ExitCode::FAILURE
        }
    }
}
