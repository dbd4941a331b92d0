pub mod config;
pub mod constants;
pub mod dispatch;
pub mod errors;
pub mod events;
pub mod models;
pub mod runtime;
pub mod store;
pub mod tracing_setup;
pub mod transport;

pub use errors::TransportError;
pub use runtime::CoreRuntime;
