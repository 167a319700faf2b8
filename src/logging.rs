/// Initialize logging with tracing
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sumsq=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
