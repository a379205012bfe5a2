use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Initialize console logging. Diagnostics go to stderr so stdout stays
/// clean for table output; RUST_LOG overrides the computed filter.
pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},hyper=warn,reqwest=warn,tablepull={}", level, level))
    });

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .compact()
        .boxed();

    Registry::default().with(env_filter).with(console_layer).init();

    debug!("Logging initialized at {} level", level);
}
