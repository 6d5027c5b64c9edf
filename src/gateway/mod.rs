pub mod health;
pub mod server;
pub mod validate;

pub use server::{build_router, shutdown_signal, AppState, GatewayServer};
