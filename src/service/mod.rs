pub mod connections;
pub mod publisher;

pub use connections::{ConnectionService, SweepReport};
pub use publisher::{PublishReport, Publisher};
