use std::io::Write;

use env_logger::{Builder, Env, fmt::Color};
use log::{Level, LevelFilter};

mod error;
pub use error::LoggerError;

/// Environment variable overriding the requested verbosity
/// (standard `env_logger` filter syntax).
pub const LOG_ENV_VAR: &str = "CELLPILE_LOG";

/// Initialize the global logger from a verbosity level.
///   0: Error   1: Warn   2: Info   3: Debug   4+: Trace
///
/// Error records additionally carry a `(file:line)` traceback.
///
/// # Errors
/// Returns [`LoggerError::AlreadySet`] if a global logger was installed
/// beforehand.
pub fn init_logger(verbosity: u8) -> Result<(), LoggerError> {
    let env = Env::default().filter(LOG_ENV_VAR);

    Builder::new()
        .filter_level(u8_to_loglevel(verbosity))
        .format(|buf, record| {
            let traceback = match record.level() {
                Level::Error => format!(
                    "(@ {}:{}) ",
                    record.file().unwrap_or("unknown"),
                    record.line().unwrap_or(0)
                ),
                _ => String::new(),
            };

            let mut level_style = buf.style();
            let color = match record.level() {
                Level::Error => Color::Red,
                Level::Warn  => Color::Yellow,
                Level::Info  => Color::Green,
                Level::Debug => Color::Blue,
                Level::Trace => Color::Cyan,
            };
            level_style.set_color(color).set_bold(true);

            writeln!(
                buf,
                "[{} {: <5} {}] {traceback}{}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                level_style.value(record.level()),
                record.target(),
                record.args()
            )
        })
        .parse_env(env)
        .try_init()
        .map_err(|_| LoggerError::AlreadySet)
}

/// Adjust the maximum level after initialization.
pub fn set_level(verbosity: u8) {
    log::set_max_level(u8_to_loglevel(verbosity));
}

fn u8_to_loglevel(verbosity: u8) -> LevelFilter {
    match verbosity {
        0           => LevelFilter::Error,
        1           => LevelFilter::Warn,
        2           => LevelFilter::Info,
        3           => LevelFilter::Debug,
        4..=u8::MAX => LevelFilter::Trace,
    }
}
