//! Serial console logger.
//!
//! The host supplies the clock and the output sink, so the same logger runs
//! on the robot controller and in a desktop simulator.

use core::{fmt, time::Duration};

use log::{max_level, set_logger, set_max_level, LevelFilter, Log, Metadata, Record, SetLoggerError};

const ESCAPES: [Option<&str>; 6] = [
    None,             // Default foreground
    Some("\x1B[31m"), // Error (red)
    Some("\x1B[33m"), // Warn (yellow)
    Some("\x1B[34m"), // Info (blue)
    Some("\x1B[36m"), // Debug (cyan)
    Some("\x1B[37m"), // Trace (white)
];

pub struct SerialLogger {
    /// Time since boot.
    clock: fn() -> Duration,
    /// Writes one formatted line, newline not included.
    write: fn(fmt::Arguments<'_>),
}

impl SerialLogger {
    pub const fn new(clock: fn() -> Duration, write: fn(fmt::Arguments<'_>)) -> Self {
        Self { clock, write }
    }

    pub fn init(&'static self, level: LevelFilter) -> Result<(), SetLoggerError> {
        set_logger(self)?;
        set_max_level(level);

        Ok(())
    }
}

impl Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            let timestamp = (self.clock)();
            let mins = timestamp.as_secs() / 60;
            let submin_secs = timestamp.as_secs() % 60;

            (self.write)(format_args!(
                "{:02}:{:02}:{:03} {}[{}]\x1B[0m {}",
                mins,
                submin_secs,
                timestamp.subsec_millis(),
                ESCAPES[record.level() as usize].unwrap_or_default(),
                record.level(),
                record.args()
            ));
        }
    }

    fn flush(&self) {}
}
