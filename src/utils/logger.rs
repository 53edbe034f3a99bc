//! log4rs setup for processes embedding the data layer.
//!
//! Library code only ever logs through the `log` facade. Targets used:
//! - `colloquy::audit`: mutations (create, add message, delete) and their outcome
//! - `colloquy::fallback`: tier transitions on the read and delete paths
//! - `colloquy::metrics`: cache and codec summaries
//! - `colloquy::dev6`: developer trace lines from `dev6!`

use log::LevelFilter;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::{Path, PathBuf};

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;

fn parse_level(level: Option<&str>) -> LevelFilter {
    match level.unwrap_or("info").to_ascii_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

fn rolling(base: &Path, stem: &str, keep: u32) -> Result<RollingFileAppender, Box<dyn std::error::Error>> {
    let roller = FixedWindowRoller::builder()
        .build(&format!("{}", base.join(format!("{stem}.{{}}.log")).display()), keep)?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    let appender = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(base.join(format!("{stem}.log")), Box::new(policy))?;
    Ok(appender)
}

/// Builds the rolling-file configuration without installing it.
///
/// # Errors
/// Returns an error if the directory cannot be created or an appender cannot open its file.
pub fn build_config(
    dir: &Path,
    level: Option<&str>,
    retention: Option<usize>,
    enable_dev6: bool,
) -> Result<Config, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(dir)?;
    let keep = u32::try_from(retention.unwrap_or(7)).unwrap_or(7);
    let lvl = parse_level(level);
    let mut builder = Config::builder()
        .appender(Appender::builder().build("app", Box::new(rolling(dir, "app", keep)?)))
        .appender(Appender::builder().build("audit", Box::new(rolling(dir, "audit", keep)?)))
        .appender(Appender::builder().build("metrics", Box::new(rolling(dir, "metrics", keep)?)))
        .logger(Logger::builder().appender("audit").additive(false).build("colloquy::audit", lvl))
        .logger(Logger::builder().appender("metrics").additive(false).build("colloquy::metrics", lvl))
        .logger(Logger::builder().appender("app").additive(false).build("colloquy::fallback", lvl));
    if enable_dev6 {
        builder = builder
            .appender(Appender::builder().build("dev6", Box::new(rolling(dir, "dev6", keep)?)))
            .logger(
                Logger::builder()
                    .appender("dev6")
                    .additive(false)
                    .build("colloquy::dev6", LevelFilter::Trace),
            );
    } else {
        builder = builder.logger(Logger::builder().additive(false).build("colloquy::dev6", LevelFilter::Off));
    }
    Ok(builder.build(Root::builder().appender("app").build(lvl))?)
}

/// Installs rolling file logging under `dir` (current directory when `None`).
///
/// # Errors
/// Returns an error if the configuration cannot be built or a logger is already installed.
pub fn configure_logging(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<usize>,
    enable_dev6: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let base = dir
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let config = build_config(&base, level, retention, enable_dev6)?;
    log4rs::init_config(config)?;
    Ok(())
}

/// Configure logging from environment variables if present:
/// - COLLOQUY_LOG_DIR
/// - COLLOQUY_LOG_LEVEL
/// - COLLOQUY_LOG_RETENTION
/// - COLLOQUY_DEV6
///
/// # Errors
/// Same as [`configure_logging`].
pub fn configure_from_env() -> Result<(), Box<dyn std::error::Error>> {
    let dir = std::env::var("COLLOQUY_LOG_DIR").ok().map(PathBuf::from);
    let level = std::env::var("COLLOQUY_LOG_LEVEL").ok();
    let retention =
        std::env::var("COLLOQUY_LOG_RETENTION").ok().and_then(|s| s.parse::<usize>().ok());
    let dev6 = std::env::var("COLLOQUY_DEV6")
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);
    configure_logging(dir.as_deref(), level.as_deref(), retention, dev6)
}
