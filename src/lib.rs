pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod pinterest;
pub mod router;
pub mod service;
pub mod vault;

pub use error::BeamError;
pub use pinterest::client::{PinterestApi, PinterestClient};
pub use service::connections::ConnectionService;
pub use service::publisher::Publisher;
pub use vault::{HttpVault, MemoryVault, TokenVault};
