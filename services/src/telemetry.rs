//! Log and trace subscriber setup.
//!
//! - `local` / `test`: human readable fmt output
//! - `prod`: Stackdriver JSON lines, with Cloud Trace correlation when
//!   `GOOGLE_CLOUD_PROJECT` is set, plus the OpenTelemetry layer and the W3C
//!   trace-context propagator used by the request span in `routes`.

use crate::config::{Config, Env};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use std::env;
use tracing_stackdriver::CloudTraceConfiguration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,product_tables_services=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

pub fn init_tracing(config: &Config) -> anyhow::Result<()> {
    match config.environment() {
        Env::Local | Env::Test => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(tracing_subscriber::fmt::layer())
                .try_init()?;
        }
        Env::Prod => {
            opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

            let stackdriver_layer = match env::var("GOOGLE_CLOUD_PROJECT") {
                Ok(project_id) => tracing_stackdriver::layer()
                    .with_cloud_trace(CloudTraceConfiguration { project_id }),
                Err(_) => tracing_stackdriver::layer(),
            };

            tracing_subscriber::registry()
                .with(env_filter())
                .with(tracing_opentelemetry::layer())
                .with(stackdriver_layer)
                .try_init()?;
        }
    }

    Ok(())
}
