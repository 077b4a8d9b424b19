use crate::cli::{
    actions::Action,
    commands,
    dispatch::handler,
    telemetry::{self, LogFormat},
};
use anyhow::Result;
use tracing::Level;

/// Map the `-v` count (or `FINTRACK_LOG_LEVEL`) to a tracing level.
#[must_use]
pub fn get_verbosity_level(verbosity: u8) -> Option<Level> {
    match verbosity {
        0 => None,
        1 => Some(Level::WARN),
        2 => Some(Level::INFO),
        3 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

/// Start the CLI
/// # Errors
/// Returns an error if logging cannot be initialized or arguments are invalid.
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    let verbosity_level = get_verbosity_level(
        matches
            .get_one::<u8>(commands::logging::ARG_VERBOSITY)
            .copied()
            .unwrap_or(0),
    );

    let log_format = matches
        .get_one::<String>(commands::logging::ARG_LOG_FORMAT)
        .map_or(Ok(LogFormat::default()), |format| format.parse())?;

    telemetry::init(verbosity_level, log_format)?;

    let action = handler(&matches)?;

    Ok(action)
}
