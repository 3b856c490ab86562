//! Control API implementation

pub mod dto;
pub mod metrics_handler;
pub mod router;
pub mod session_handler;

pub use dto::{ApiResponse, SessionResponse};
pub use metrics_handler::{describe_metrics, init_metrics};
pub use router::build_router;
pub use session_handler::AppState;
