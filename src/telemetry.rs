use tracing_error::ErrorLayer;
use tracing_subscriber::{
    filter::{Directive, EnvFilter},
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Install the global subscriber. `level` is the default directive; `RUST_LOG`
/// overrides it.
pub fn init(level: &str) -> anyhow::Result<()> {
    let directive: Directive = level.parse()?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt::layer().with_target(true))
        .try_init()?;
    Ok(())
}
