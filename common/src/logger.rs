use std::fs::{create_dir_all, metadata};

use fern::Dispatch;
use log::LevelFilter;
use thiserror::Error;

#[cfg(not(debug_assertions))]
use chrono::Local;

#[cfg(debug_assertions)]
use fern::colors::{Color, ColoredLevelConfig};

#[cfg(not(debug_assertions))]
use fern::DateBased;

#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error(transparent)]
    LogError(#[from] log::SetLoggerError),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

/// Initialize the process-wide logger.
///
/// In debug builds this writes colorized, file-tagged lines to stdout. In
/// release builds it writes timestamped lines to a date-based rotating file
/// under `log_dir` (falling back to stdout if no directory is given).
#[allow(unused_variables)]
pub fn init_logger(level: LevelFilter, log_dir: Option<&str>) -> Result<(), LoggerInitError> {
    let mut logger = Dispatch::new()
        .level(level)
        .level_for("tower_http", LevelFilter::Warn)
        .level_for("hyper", LevelFilter::Warn);

    #[cfg(debug_assertions)]
    {
        let colors = ColoredLevelConfig::new()
            .info(Color::Blue)
            .warn(Color::Yellow)
            .error(Color::Red);

        logger = logger
            .format(move |out, message, record| {
                out.finish(format_args!(
                    "[{}] - ({}) - {}",
                    colors.color(record.level()),
                    record.file_static().unwrap_or("*"),
                    message
                ))
            })
            .chain(std::io::stdout());
    }

    #[cfg(not(debug_assertions))]
    {
        logger = logger.format(move |out, message, record| {
            out.finish(format_args!(
                "{} - [{}] - ({}) - {}",
                Local::now().format("%m-%d %H:%M:%S"),
                record.level(),
                record.file_static().unwrap_or("*"),
                message
            ))
        });

        if let Some(dir) = log_dir {
            if metadata(dir).is_err() {
                create_dir_all(dir)?;
            }

            logger = logger.chain(DateBased::new(dir, "%Y-%m-%d-ingestd.log"))
        } else {
            logger = logger.chain(std::io::stdout());
        }
    }

    logger.apply()?;

    std::panic::set_hook(Box::new(|info| {
        log::error!(
            "panic: location={:?}, message={:?}",
            info.location(),
            info.payload().downcast_ref::<String>(),
        );
    }));

    Ok(())
}
