use std::io;
use tracing_subscriber::{fmt, EnvFilter};

/// Default directives when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,sea_orm=info";

fn env_filter(fallback: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(fallback.unwrap_or(DEFAULT_FILTER)))
}

/// Initialize tracing subscriber with compact human-readable output on stdout.
/// - Respects `RUST_LOG` if set
/// - Falls back to `fallback`, or `DEFAULT_FILTER` when `None`
pub fn init_logging_default(fallback: Option<&str>) {
    let _ = fmt()
        .with_env_filter(env_filter(fallback))
        .with_target(false)
        .compact()
        .with_writer(io::stdout)
        .try_init();
}

/// Initialize tracing subscriber with JSON structured output on stdout.
/// Use `RUST_LOG=info,service::repository=debug` to see every backend call.
pub fn init_logging_json(fallback: Option<&str>) {
    let _ = fmt()
        .with_env_filter(env_filter(fallback))
        .with_target(true)
        .json()
        .with_writer(io::stdout)
        .try_init();
}

/// Pick the subscriber flavour by name (`"json"` or anything else for compact).
pub fn init_logging(format: &str, fallback: Option<&str>) {
    if format.eq_ignore_ascii_case("json") {
        init_logging_json(fallback);
    } else {
        init_logging_default(fallback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init_logging("compact", Some("warn"));
        init_logging("json", None);
        tracing::info!("still alive");
    }
}
