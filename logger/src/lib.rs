//! Logging setup shared by the fractal array binaries.
//!
//! Library crates of this workspace only use the [`log`] facade. Binaries call [`setup`] once at
//! startup, which installs an [`env_logger`] configured by the `FRACTAL_LOG` (filter, default
//! `info`) and `FRACTAL_LOG_STYLE` (colors) environment variables.
//!
//! Every line is prefixed with the elapsed time and the current and peak resident memory, which
//! makes it easy to follow how the representations of large arrays evolve during a workload.
//! Consecutive records of the same target are grouped under a single target header.
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::undocumented_unsafe_blocks)]
#![warn(missing_docs)]

use std::{
    io::{self, Write},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::{Duration, Instant},
};

use anstyle::{AnsiColor, Color, Style};

mod rss;

use rss::Rss;

/// Environment variable holding the log filter.
pub const FILTER_ENV: &str = "FRACTAL_LOG";

/// Environment variable selecting whether to use colors.
pub const STYLE_ENV: &str = "FRACTAL_LOG_STYLE";

const fn fg(color: AnsiColor) -> Style {
    Style::new().fg_color(Some(Color::Ansi(color)))
}

const ELAPSED_STYLE: Style = fg(AnsiColor::BrightBlack);
const CURRENT_STYLE: Style = fg(AnsiColor::Blue);
const PEAK_STYLE: Style = fg(AnsiColor::BrightBlack);
const NEW_PEAK_STYLE: Style = fg(AnsiColor::Red);
const TARGET_STYLE: Style = fg(AnsiColor::Magenta);

/// Per logger state shared by all records.
struct Header {
    start: Instant,
    peak: AtomicUsize,
    last_target: Mutex<String>,
}

impl Header {
    fn new() -> Self {
        Header {
            start: Instant::now(),
            peak: AtomicUsize::new(Rss::now().peak.0),
            last_target: Mutex::new(String::new()),
        }
    }

    fn write_prefix(
        out: &mut impl Write,
        elapsed: Duration,
        rss: Rss,
        new_peak: bool,
    ) -> io::Result<()> {
        let peak_style = if new_peak { NEW_PEAK_STYLE } else { PEAK_STYLE };
        let Rss { current, peak } = rss;
        write!(
            out,
            "{ELAPSED_STYLE}{elapsed:>9.2?}{ELAPSED_STYLE:#} \
             {CURRENT_STYLE}{current}{CURRENT_STYLE:#} \
             {peak_style}{peak}{peak_style:#}"
        )
    }

    fn format(&self, buf: &mut env_logger::fmt::Formatter, record: &log::Record) -> io::Result<()> {
        let elapsed = self.start.elapsed();
        let rss = Rss::now();
        let new_peak = self.peak.fetch_max(rss.peak.0, Ordering::Relaxed) < rss.peak.0;
        let target = record.target();

        {
            let mut last_target = self.last_target.lock().unwrap_or_else(|err| err.into_inner());
            if *last_target != target {
                last_target.clear();
                last_target.push_str(target);
                Self::write_prefix(buf, elapsed, rss, new_peak)?;
                writeln!(buf, " {TARGET_STYLE}{target}{TARGET_STYLE:#}")?;
            }
        }

        let level_style = buf.default_level_style(record.level());
        Self::write_prefix(buf, elapsed, rss, new_peak)?;
        writeln!(
            buf,
            " {level_style}{level}{level_style:#} {args}",
            level = record.level(),
            args = record.args()
        )
    }
}

/// Returns the builder used by [`setup`], for binaries that need to adjust it further.
pub fn builder() -> env_logger::Builder {
    let header = Header::new();
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::new()
            .filter_or(FILTER_ENV, "info")
            .write_style(STYLE_ENV),
    );
    builder.format(move |buf, record| header.format(buf, record));
    builder
}

/// Installs the default logger, reading its configuration from the environment.
///
/// # Panics
///
/// Panics if a logger was already installed.
pub fn setup() {
    builder().init();
}

/// Installs the default logger unless another logger is already installed.
pub fn try_setup() -> Result<(), log::SetLoggerError> {
    builder().try_init()
}
