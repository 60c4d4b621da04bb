pub mod admin_handler;
pub mod health_handler;
pub mod intake_handler;
pub mod user_handler;

pub use admin_handler::*;
pub use health_handler::*;
pub use intake_handler::*;
pub use user_handler::*;
