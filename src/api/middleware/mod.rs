mod auth;
mod logging;

pub use auth::Session;
pub use logging::request_logger;
