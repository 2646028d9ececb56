// ttlock-api: Async Rust client for the TTLock cloud open API

pub mod client;
pub mod error;
pub mod gateway;
pub mod locks;
pub mod models;
pub mod passcodes;
pub mod transport;
pub mod webhook;

pub use client::TtlockClient;
pub use error::Error;
pub use gateway::GatewayLock;
pub use transport::{TlsMode, TransportConfig};
pub use webhook::WebhookDelivery;
