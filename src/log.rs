//! Logging setup for mgplan, built on `fern`.
//!
//! Errors and warnings are written to stderr and everything else to stdout, with coloured level
//! names when the stream is a terminal. For the `run` command the same messages are also written
//! to two files in the output directory.
use anyhow::{Context, Result, ensure};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{LevelFilter, Metadata, Record};
use std::env;
use std::fmt::{Arguments, Display};
use std::fs::File;
use std::io::IsTerminal;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

/// Set once the logger is installed
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// Log level used when neither the environment nor the settings file give one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable which takes precedence over `log_level` in `settings.toml`
pub const LOG_LEVEL_ENV_VAR: &str = "MGPLAN_LOG_LEVEL";

/// Receives info, debug and trace messages
const LOG_INFO_FILE_NAME: &str = "mgplan_info.log";

/// Receives warnings and errors
const LOG_ERROR_FILE_NAME: &str = "mgplan_error.log";

/// Whether [`init`] has already succeeded in this process
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Pick the log level: environment variable first, then settings, then the default.
///
/// Level names are case-insensitive: `off`, `error`, `warn`, `info`, `debug` or `trace`.
fn resolve_log_level(from_settings: Option<&str>) -> Result<LevelFilter> {
    let name = env::var(LOG_LEVEL_ENV_VAR)
        .ok()
        .or_else(|| from_settings.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

    LevelFilter::from_str(name.trim()).ok().with_context(|| format!("Unknown log level: {name}"))
}

fn is_error_or_warning(metadata: &Metadata) -> bool {
    metadata.level() <= LevelFilter::Warn
}

/// Set up the program logger.
///
/// # Arguments
///
/// * `log_level_from_settings` - The `log_level` from `settings.toml`, if any
/// * `log_dir` - Directory for log files; no files are written if `None`
pub fn init(log_level_from_settings: Option<&str>, log_dir: Option<&Path>) -> Result<()> {
    ensure!(!is_logger_initialised(), "Logger already initialised");
    let level = resolve_log_level(log_level_from_settings)?;

    let mut dispatch = Dispatch::new()
        .chain(
            terminal_dispatch(std::io::stdout().is_terminal())
                .filter(|metadata| !is_error_or_warning(metadata))
                .level(level)
                .chain(std::io::stdout()),
        )
        .chain(
            terminal_dispatch(std::io::stderr().is_terminal())
                .level(level.min(LevelFilter::Warn))
                .chain(std::io::stderr()),
        );

    if let Some(log_dir) = log_dir {
        let info_file = create_log_file(log_dir, LOG_INFO_FILE_NAME)?;
        let error_file = create_log_file(log_dir, LOG_ERROR_FILE_NAME)?;

        // Files always get at least info messages, whatever the terminal shows
        dispatch = dispatch
            .chain(
                Dispatch::new()
                    .filter(|metadata| !is_error_or_warning(metadata))
                    .format(format_plain)
                    .level(level.max(LevelFilter::Info))
                    .chain(info_file),
            )
            .chain(
                Dispatch::new()
                    .format(format_plain)
                    .level(LevelFilter::Warn)
                    .chain(error_file),
            );
    }

    dispatch.apply()?;
    LOGGER_INIT.set(()).expect("Logger initialised twice");

    Ok(())
}

fn create_log_file(log_dir: &Path, file_name: &str) -> Result<File> {
    let path = log_dir.join(file_name);
    File::create(&path).with_context(|| format!("Could not create log file {}", path.display()))
}

/// A dispatch for a terminal stream, colouring the level name if requested
fn terminal_dispatch(use_colour: bool) -> Dispatch {
    if !use_colour {
        return Dispatch::new().format(format_plain);
    }

    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);
    Dispatch::new().format(move |out, message, record| {
        write_line(out, colours.color(record.level()), record.target(), message);
    })
}

fn format_plain(out: FormatCallback, message: &Arguments, record: &Record) {
    write_line(out, record.level(), record.target(), message);
}

/// Format one line as `[HH:MM:SS LEVEL module] message`
fn write_line<T: Display>(out: FormatCallback, level: T, target: &str, message: &Arguments) {
    let timestamp = Local::now().format("%H:%M:%S");
    let module = short_target(target);

    out.finish(format_args!("[{timestamp} {level} {module}] {message}"));
}

/// Drop the crate name from a log target, e.g. `mgplan::writer` becomes `writer`
fn short_target(target: &str) -> &str {
    match target.split_once("::") {
        Some(("mgplan", module)) => module,
        _ => target,
    }
}
