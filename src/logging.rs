// Logging initialization, driven by `--log-level`/`--debug`
// (`--debug` takes precedence, per spec §6).

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::LogLevel;

pub fn init_tracing(level: LogLevel) {
	let directive = level.as_tracing_level();
	let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(directive));

	tracing_subscriber::registry().with(filter).with(tracing_subscriber::fmt::layer()).init();
}
