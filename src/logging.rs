//! Tracing subscriber setup

use crate::states::Data;
use anyhow::Context;
use tracing_subscriber::{
	filter::{EnvFilter, LevelFilter},
	layer::SubscriberExt,
	util::SubscriberInitExt,
	Layer,
};

/// Install the global tracing subscriber
///
/// Production logs are emitted as JSON, development logs are pretty printed.
/// The `tokio-console` layer is only added when asked for in the config.
pub(crate) fn setup_logging(data: &Data) -> anyhow::Result<()> {
	let filter = EnvFilter::builder()
		.with_default_directive(LevelFilter::INFO.into())
		.from_env()
		.context("invalid `RUST_LOG` directives")?;

	let fmt_layer = if data.config.production {
		tracing_subscriber::fmt::layer()
			.json()
			.with_current_span(true)
			.boxed()
	} else {
		tracing_subscriber::fmt::layer()
			.pretty()
			.with_file(true)
			.with_line_number(true)
			.boxed()
	};

	let console_layer = data
		.config
		.tokio_console
		.then(console_subscriber::spawn);

	tracing_subscriber::registry()
		.with(console_layer)
		.with(fmt_layer.with_filter(filter))
		.try_init()
		.context("failed to install the tracing subscriber")?;

	Ok(())
}
