//! Optional `log4rs` setup for hosts embedding the engine.
//!
//! The engine only talks to the `log` facade; nothing here runs unless the
//! host calls it.

use log::LevelFilter;
use std::path::Path;

use crate::config::EngineConfig;
use crate::utils::devlog::DEV_TARGET;

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";

/// Initializes logging from a `log4rs` YAML file.
///
/// # Errors
/// Returns an error if the file cannot be read or a logger is already installed.
pub fn init_path(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    log4rs::init_file(path, log4rs::config::Deserializers::default())?;
    Ok(())
}

/// Console logging at the configured level. `dev6` benchmark lines are only
/// printed when `cfg.bench_logs` is set and the level is `trace`.
///
/// # Errors
/// Returns an error if the configuration is rejected or a logger is already installed.
pub fn init_console(cfg: &EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    use log4rs::append::console::ConsoleAppender;
    use log4rs::config::{Appender, Config, Logger, Root};
    use log4rs::encode::pattern::PatternEncoder;

    let stdout = ConsoleAppender::builder().encoder(Box::new(PatternEncoder::new(PATTERN))).build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .logger(Logger::builder().build(DEV_TARGET, dev6_level(cfg)))
        .build(Root::builder().appender("stdout").build(cfg.level_filter()))?;
    log4rs::init_config(config)?;
    Ok(())
}

/// File logging to `{dir}/memquery.log`, creating `dir` if needed.
///
/// # Errors
/// Returns an error if the directory cannot be created, the appender fails to
/// open its file, or a logger is already installed.
pub fn init_file(dir: &Path, cfg: &EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    use log4rs::append::file::FileAppender;
    use log4rs::config::{Appender, Config, Logger, Root};
    use log4rs::encode::pattern::PatternEncoder;

    std::fs::create_dir_all(dir)?;
    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(dir.join("memquery.log"))?;
    let config = Config::builder()
        .appender(Appender::builder().build("file", Box::new(file_appender)))
        .logger(Logger::builder().build(DEV_TARGET, dev6_level(cfg)))
        .build(Root::builder().appender("file").build(cfg.level_filter()))?;
    log4rs::init_config(config)?;
    Ok(())
}

fn dev6_level(cfg: &EngineConfig) -> LevelFilter {
    if cfg.bench_logs { cfg.level_filter() } else { LevelFilter::Off }
}
