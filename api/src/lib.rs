pub mod error;
pub mod logging;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::build_router;
pub use state::AppState;
