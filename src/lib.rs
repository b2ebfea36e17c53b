pub mod config;
pub mod directions;
pub mod error;
pub mod export;
pub mod ingest;
pub mod routes;
pub mod service;
pub mod store;

pub use config::{Config, ValidationMode};
pub use error::{RouteError, RouteResult};
pub use service::{ComputeSummary, ErrorResponse, RouteService, UploadSummary};
pub use store::{DatasetStore, SessionId};
