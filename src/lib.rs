// Waitlist Gateway
//
// HTTP service behind a marketing site's email waitlist:
//
// - Fixed-window rate limiting per client IP
// - Email syntax validation
// - Case-insensitive deduplicated in-memory storage
// - Fire-and-forget signup notifications through SendGrid, enriched with
//   IP geolocation when it arrives in time

pub mod config;
pub mod error;
pub mod geolocation;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod notifier;
pub mod rate_limit;
pub mod state;
pub mod store;
pub mod validator;
pub mod worker;

pub use config::Args;
pub use error::ApiError;
pub use handlers::router;
pub use state::AppState;
