use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "FITPRO_LOG";

/// Default directives for `component` at a given `-v` count.
pub fn default_directives(component: &str, verbosity: u8) -> String {
    let (base, own) = match verbosity {
        0 => ("warn", "info"),
        1 => ("info", "debug"),
        _ => ("debug", "trace"),
    };
    format!("{base},fitpro_sync={own},{component}={own}")
}

/// Stderr logging so command output on stdout stays clean. `FITPRO_LOG`, then
/// `RUST_LOG`, override the verbosity-derived filter.
pub fn init_tracing(component: &str, verbosity: u8) {
    let filter = std::env::var(LOG_ENV)
        .ok()
        .and_then(|value| EnvFilter::try_new(value).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default_directives(component, verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity > 0)
        .with_file(verbosity > 1)
        .with_line_number(verbosity > 1)
        .compact()
        .try_init();
}
