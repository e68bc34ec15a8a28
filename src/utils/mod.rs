use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Installs the global `fmt` subscriber; `RUST_LOG` directives extend the default.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = "finance_tracker=info".parse() {
            filter = filter.add_directive(directive);
        }

        // A subscriber installed by an embedding application wins.
        let _ = fmt().with_env_filter(filter).try_init();
    });
}
