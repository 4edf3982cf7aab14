#![forbid(unsafe_code)]

pub mod catalog_service;
pub mod error;
pub mod queue_service;
pub mod review_service;
pub mod stats_service;

pub use vocab_core::Clock;

pub use catalog_service::CatalogService;
pub use error::{
    CatalogServiceError, QueueServiceError, ReviewServiceError, StatsServiceError,
};
pub use queue_service::{QueueEntry, QueueService, select_due};
pub use review_service::{AttemptRequest, RecordedAttempt, ReviewService};
pub use stats_service::{StatsService, StudentSummary, SystemSummary};
