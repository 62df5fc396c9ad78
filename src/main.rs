use std::process::ExitCode;

use pagecraft::{EngineBuilder, EngineConfig, logging};
use tracing::error;

/// `pagecraft [config.json]`: opens the editor viewport for the configured
/// asset directory. Without an argument, `pagecraft.json` is used when present.
fn main() -> ExitCode {
    let path = std::env::args().nth(1).unwrap_or_else(|| "pagecraft.json".into());
    let config = if std::path::Path::new(&path).exists() {
        match EngineConfig::from_file(&path) {
            Ok(config) => config,
            Err(err) => {
                logging::init("info");
                error!("{err}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        EngineConfig::default()
    };

    logging::init(&config.log_filter);
    match EngineBuilder::from_config(config).run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
