use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan, prelude::*};

/// Installs the global subscriber. `RUST_LOG` applies unless `debug` is set.
pub fn init(debug: bool) -> anyhow::Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::builder()
            .with_default_directive(tracing::Level::INFO.into())
            .from_env_lossy()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_span_events(FmtSpan::CLOSE))
        .try_init()?;

    Ok(())
}
