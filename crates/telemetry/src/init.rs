// Path: crates/telemetry/src/init.rs
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// The log targets the filler emits progress on: the engine's commit lines,
/// the transport, the store, and the binary itself.
const FILL_TARGETS: [&str; 4] = ["fill", "upstream", "storage", "statefilld"];

/// Initializes the global `tracing` subscriber for structured JSON logging.
///
/// Output goes to stderr so tools reading the materialized data can own
/// stdout. `RUST_LOG` takes precedence when set; otherwise dependencies are
/// capped at `warn` and the filler's own targets stay at `info`, which keeps
/// the one-line-per-commit progress signal visible without third-party
/// noise drowning it during long bootstrap fills.
pub fn init_tracing() -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter());
    let fmt_layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339());
    let subscriber = Registry::default().with(filter).with(fmt_layer);
    tracing_log::LogTracer::init()?;
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn default_filter() -> EnvFilter {
    let mut filter = EnvFilter::new("warn");
    for target in FILL_TARGETS {
        // The directives are static and well-formed; skip rather than fail
        // if one ever is not.
        if let Ok(directive) = format!("{target}=info").parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_keeps_fill_progress_visible() {
        let rendered = default_filter().to_string();
        assert!(rendered.contains("warn"), "got {rendered}");
        for target in FILL_TARGETS {
            assert!(rendered.contains(&format!("{target}=info")), "got {rendered}");
        }
    }
}
