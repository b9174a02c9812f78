use time::UtcOffset;
use tracing_subscriber::{
    fmt::time::OffsetTime, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::config::AppConfig;
use crate::errors::ConfigValidationError;

/// Initializes the global `tracing` subscriber from an [`AppConfig`]'s
/// logging section. `trace_frames` adds targeted trace-level directives
/// for the protocol modules on top of the configured base level, so wire
/// dumps can be turned on without dropping everything else to `trace`.
pub fn setup_logging(config: &AppConfig) -> Result<(), ConfigValidationError> {
    config.logging.validate()?;

    let timer = OffsetTime::new(
        UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
        time::format_description::well_known::Rfc3339,
    );

    let base_level = config.logging.get_level_filter();
    let mut env_filter = EnvFilter::default().add_directive(base_level.into());
    if config.logging.trace_frames {
        env_filter = env_filter
            .add_directive("modbus_station::proto=trace".parse().unwrap())
            .add_directive("modbus_station::client=trace".parse().unwrap())
            .add_directive("modbus_station::server=trace".parse().unwrap());
    }

    let base_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(config.logging.thread_ids)
        .with_thread_names(config.logging.thread_names)
        .with_file(config.logging.include_location)
        .with_line_number(config.logging.include_location)
        .with_timer(timer);

    let init_result = if config.logging.format.eq_ignore_ascii_case("json") {
        Registry::default()
            .with(base_layer.json().with_filter(env_filter))
            .try_init()
    } else {
        Registry::default().with(base_layer.with_filter(env_filter)).try_init()
    };

    init_result
        .map_err(|err| ConfigValidationError::source(format!("failed to initialize logging: {err}")))?;

    Ok(())
}
