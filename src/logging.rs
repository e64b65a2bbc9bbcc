//! Global logging setup.

use std::{backtrace::Backtrace, env, panic};

use tracing::{error, trace};
use tracing_subscriber::{
    fmt::{self, time::uptime},
    prelude::*,
    util::TryInitError,
    EnvFilter, Registry,
};

/// Default filter: this crate at info, everything else at warn.
pub const DEFAULT_FILTER: &str = "warn,arcade_physics_server=info";

/// Builds the filter string: the default, then anything in `RUST_LOG` appended.
pub fn filter_directives(env_value: Option<&str>) -> String {
    let mut filter = DEFAULT_FILTER.to_owned();
    if let Some(extra) = env_value.filter(|s| !s.trim().is_empty()) {
        filter.push(',');
        filter.push_str(extra);
    }
    filter
}

/// Installs a compact stdout `tracing` subscriber honouring `RUST_LOG`, and
/// routes panic messages through it.
pub fn init_logging() -> Result<(), TryInitError> {
    let format = fmt::format()
        .compact()
        .with_timer(uptime())
        .with_line_number(true);
    let stdout_log = fmt::layer().event_format(format);

    let env_value = env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = filter_directives(env_value.as_deref());

    Registry::default()
        .with(EnvFilter::new(filter))
        .with(stdout_log)
        .try_init()?;

    panic::set_hook(Box::new(|info| {
        error!("{}", info);
        if env::var("RUST_BACKTRACE").map(|val| val == "1").unwrap_or(false) {
            error!("{}", Backtrace::force_capture());
        }
    }));
    trace!("installed custom panic hook");

    Ok(())
}
