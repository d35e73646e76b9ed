use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};
use tracing_tree::HierarchicalLayer;

/// Installs the global subscriber. `RUST_LOG` drives filtering and defaults to `warn`.
/// Does nothing if the host already installed one.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let tree = HierarchicalLayer::new(2)
        .with_targets(true)
        .with_indent_lines(true)
        .with_bracketed_fields(true);

    if Registry::default().with(filter).with(tree).try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
