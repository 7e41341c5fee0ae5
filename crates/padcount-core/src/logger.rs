//! Stderr logging for the padcount crates.
//!
//! Records from `padcount*` targets pass at the requested level; everything
//! else (image decoders, imageproc) is held to warnings so `--log-level debug`
//! stays readable. Lines look like
//! `[  0.412s DEBUG vision::pipeline] message`, with `file:line` appended at
//! debug and trace.

use std::fmt;
use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt as tfmt, EnvFilter};

const OWN_PREFIX: &str = "padcount";
const OWN_CRATES: [&str; 4] = ["padcount", "padcount_core", "padcount_fiducial", "padcount_vision"];
const FOREIGN_CAP: LevelFilter = LevelFilter::Warn;

fn is_own(target: &str) -> bool {
    let krate = target.split("::").next().unwrap_or(target);
    OWN_CRATES.contains(&krate)
}

/// Level a record from `target` must meet to be printed.
fn threshold(target: &str, own: LevelFilter) -> LevelFilter {
    if is_own(target) {
        own
    } else {
        own.min(FOREIGN_CAP)
    }
}

/// `padcount_vision::pipeline` becomes `vision::pipeline`.
fn short_target(target: &str) -> &str {
    target
        .strip_prefix(OWN_PREFIX)
        .and_then(|rest| rest.strip_prefix('_'))
        .filter(|_| is_own(target))
        .unwrap_or(target)
}

fn format_line(
    elapsed_secs: f64,
    level: Level,
    target: &str,
    location: Option<(&str, u32)>,
    args: fmt::Arguments<'_>,
) -> String {
    let mut line = format!(
        "[{elapsed_secs:7.3}s {level:>5} {}] {args}",
        short_target(target)
    );
    if level >= Level::Debug {
        if let Some((file, no)) = location {
            line.push_str(&format!(" ({file}:{no})"));
        }
    }
    line
}

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= threshold(metadata.target(), self.level)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let location = record.file().zip(record.line());
        let line = format_line(
            self.started.elapsed().as_secs_f64(),
            record.level(),
            record.target(),
            location,
            *record.args(),
        );
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger. Later calls keep the first level.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| StderrLogger {
        level,
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// Filter directives equivalent to the stderr logger's policy.
#[cfg(feature = "tracing")]
fn default_directives(level: LevelFilter) -> String {
    let own = level.to_string().to_lowercase();
    let cap = level.min(FOREIGN_CAP).to_string().to_lowercase();
    let mut directives = vec![cap];
    directives.extend(OWN_CRATES.iter().map(|c| format!("{c}={own}")));
    directives.join(",")
}

/// Install a `tracing-subscriber` fmt layer. `RUST_LOG` wins when set;
/// otherwise the padcount crates log at `level` and the rest at warn.
///
/// Stage spans are reported on close, so their busy/idle times show per-stage cost.
#[cfg(feature = "tracing")]
pub fn init_tracing(level: LevelFilter, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));
    let builder = tfmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(tfmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_crates_are_capped_at_warn() {
        assert_eq!(threshold("padcount_vision::hough", LevelFilter::Trace), LevelFilter::Trace);
        assert_eq!(threshold("padcount", LevelFilter::Debug), LevelFilter::Debug);
        assert_eq!(threshold("png::decoder", LevelFilter::Trace), LevelFilter::Warn);
        assert_eq!(threshold("png::decoder", LevelFilter::Error), LevelFilter::Error);
        // Lookalike crate names are not ours.
        assert_eq!(threshold("padcounter", LevelFilter::Debug), LevelFilter::Warn);
    }

    #[test]
    fn own_prefix_is_stripped() {
        assert_eq!(short_target("padcount_vision::pipeline"), "vision::pipeline");
        assert_eq!(short_target("padcount_core"), "core");
        assert_eq!(short_target("padcount"), "padcount");
        assert_eq!(short_target("image::codecs::png"), "image::codecs::png");
    }

    #[test]
    fn location_only_at_debug_and_below() {
        let at = Some(("src/pipeline.rs", 42));
        let info = format_line(1.5, Level::Info, "padcount_vision", at, format_args!("6 pads"));
        assert_eq!(info, "[  1.500s  INFO vision] 6 pads");

        let debug = format_line(0.0, Level::Debug, "padcount_fiducial::detect", at, format_args!("x"));
        assert_eq!(debug, "[  0.000s DEBUG fiducial::detect] x (src/pipeline.rs:42)");

        let no_loc = format_line(0.0, Level::Trace, "padcount", None, format_args!("y"));
        assert_eq!(no_loc, "[  0.000s TRACE padcount] y");
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn tracing_directives_mirror_the_stderr_policy() {
        assert_eq!(
            default_directives(LevelFilter::Debug),
            "warn,padcount=debug,padcount_core=debug,padcount_fiducial=debug,padcount_vision=debug"
        );
        assert!(default_directives(LevelFilter::Error).starts_with("error,"));
    }
}
