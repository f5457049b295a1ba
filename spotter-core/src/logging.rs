//! Process logger for the CLI and anything embedding the engine.

use env_logger::{Builder, Env, Target};
use log::LevelFilter;
use std::io::Write;

/// Per-module directives layered over the configured level, e.g.
/// `SPOTTER_LOG=spotter::session=debug`.
pub const LOG_FILTER_ENV: &str = "SPOTTER_LOG";

/// Installs the stderr logger at `level`. Once a logger is installed, later
/// calls only move the max level.
pub fn init_logger(level: LevelFilter) {
    if logger_builder(level).try_init().is_err() {
        log::set_max_level(level);
    }
}

fn logger_builder(level: LevelFilter) -> Builder {
    let mut builder = Builder::new();
    builder
        .filter_level(level)
        .parse_env(Env::new().filter(LOG_FILTER_ENV))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {:<5} {}] {}",
                buf.timestamp_seconds(),
                record.level(),
                short_target(record.target()),
                record.args()
            )
        })
        .target(Target::Stderr);
    builder
}

fn short_target(target: &str) -> &str {
    target.strip_prefix("spotter::").unwrap_or(target)
}

/// Accepts the `log` level names in any case, plus `warning`.
pub fn parse_log_level(level: &str) -> Option<LevelFilter> {
    let level = level.trim();
    if level.eq_ignore_ascii_case("warning") {
        return Some(LevelFilter::Warn);
    }
    level.parse().ok()
}
