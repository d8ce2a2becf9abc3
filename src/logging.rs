use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins when set. Otherwise only warnings are shown, unless the
/// debug flag asks for this crate's debug output too.
pub fn init(debug: bool) {
    let fallback = if debug {
        concat!("warn,", env!("CARGO_CRATE_NAME"), "=debug")
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
