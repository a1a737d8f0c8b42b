pub mod apdex;
pub mod beacon;
pub mod client;
mod error;
pub mod exporter;
pub mod ingestor;
pub mod server;
pub mod settings;

pub use error::{Error, Result};
