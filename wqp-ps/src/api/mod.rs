//! HTTP API handlers for wqp-ps

pub mod artifacts;
pub mod buildinfo;
pub mod features;
pub mod health;
pub mod predict;

pub use artifacts::list_artifacts;
pub use buildinfo::get_build_info;
pub use features::list_features;
pub use health::health_routes;
pub use predict::{predict, PredictionReport};
