pub mod error;
pub mod html;
pub mod retry;
pub mod scheduled_executor;

pub use error::{ApiError, ApiResult};
pub use retry::retry_with_backoff;
pub use scheduled_executor::{ScheduledExecutor, ScheduledTask};
