//! Logging bootstrap.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use shelf_kernel::settings::{LogFormat, TelemetrySettings};

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Install the global tracing subscriber. Later calls are no-ops.
///
/// `RUST_LOG` takes precedence over the configured filter. Output goes to
/// stderr so command output on stdout stays clean.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    INITIALIZED.get_or_try_init(|| install(settings))?;
    Ok(())
}

fn install(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .map_err(|err| anyhow::anyhow!("invalid log filter '{}': {err}", settings.filter))?;

    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);

    let installed = match settings.log_format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    if installed.is_err() {
        // Another subscriber (a test harness, an embedding app) got there first.
        tracing::debug!(target: "shelf-telemetry", "global subscriber already set");
    }

    tracing::debug!(
        target: "shelf-telemetry",
        format = ?settings.log_format,
        filter = %settings.filter,
        "telemetry initialized"
    );
    Ok(())
}
