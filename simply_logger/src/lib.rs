use chrono::Local;
use colored::*;
use log::{Level, LevelFilter};
use std::path::Path;

const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const RECORD_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

fn log_file_name() -> String {
    format!("simply_log_{}.log", Local::now().format(FILE_TIMESTAMP_FORMAT))
}

fn colored_level(level: Level) -> ColoredString {
    match level {
        Level::Error => "ERROR".red().bold(),
        Level::Warn => "WARN ".yellow().bold(),
        Level::Info => "INFO ".green().bold(),
        Level::Debug => "DEBUG".blue().bold(),
        Level::Trace => "TRACE".magenta().bold(),
    }
}

/// Parses a level name such as `"warn"` or `"TRACE"`; `"off"` disables the sink.
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    name.trim().parse().ok()
}

/// Installs the global logger. Console records go to stderr so they never mix
/// with program output on stdout. With `log_dir` set, a timestamped log file is
/// created there as well.
pub fn init(
    log_dir: Option<impl AsRef<Path>>,
    console_level: LevelFilter,
    file_level: LevelFilter,
) -> Result<(), fern::InitError> {
    let console_dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] [{}] [{}] {}",
                Local::now().format(RECORD_TIMESTAMP_FORMAT),
                colored_level(record.level()),
                record.target(),
                message
            ))
        })
        .level(console_level)
        .chain(std::io::stderr());

    let mut base_dispatch = fern::Dispatch::new().chain(console_dispatch);

    if let Some(dir) = log_dir {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(log_file_name());

        let file_dispatch = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "[{}] [{:<5}] [{}:{}] {}",
                    Local::now().format(RECORD_TIMESTAMP_FORMAT),
                    record.level(),
                    record.file().unwrap_or("?"),
                    record.line().unwrap_or(0),
                    message
                ))
            })
            .level(file_level)
            .chain(fern::log_file(&path)?);

        base_dispatch = base_dispatch.chain(file_dispatch);
    }

    base_dispatch.apply()?;
    log::debug!("Logger initialized. Console level: {}, file level: {}", console_level, file_level);

    Ok(())
}
