mod auth;
mod health;
mod response;

pub use auth::handle_auth;
pub use health::{handle_debug, handle_health};
pub use response::sanitize_header_value;
