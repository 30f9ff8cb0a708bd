use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "chatdesk=info";

/// Picks the filter directive: `RUST_LOG`, then the config file, then the default.
pub fn resolve_filter(env_value: Option<String>, configured: Option<&str>) -> String {
    env_value
        .filter(|value| !value.trim().is_empty())
        .or_else(|| configured.map(str::to_string))
        .filter(|value| EnvFilter::try_new(value).is_ok())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

pub fn init(configured: Option<&str>) {
    let directive = resolve_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok(), configured);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
