pub mod json;
pub mod response;
pub mod session;

pub use json::JsonBody;
pub use response::{ApiResponse, ApiResult};
pub use session::{client_info, require_session, AuthSession};
