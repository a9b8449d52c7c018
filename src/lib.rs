pub mod batch;
pub mod cache;
pub mod cell_map;
pub mod config;
pub mod error;
pub mod excel;
pub mod export;
pub mod models;
pub mod services;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with_writer(std::io::stderr)
        .try_init();
}
