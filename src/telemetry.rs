use tracing_subscriber::EnvFilter;

// RUST_LOG wins over the configured filter. Logs go to stderr so stdout
// stays clean for CSV / JSON output.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
