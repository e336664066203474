use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Installs the stderr subscriber once per process.
///
/// Filtering comes from `EPIWEEK_LOG` (e.g. `EPIWEEK_LOG=epiweek_series=debug`),
/// falling back to `epiweek_series=info`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("EPIWEEK_LOG")
            .unwrap_or_else(|_| EnvFilter::new("epiweek_series=info"));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    });
}
