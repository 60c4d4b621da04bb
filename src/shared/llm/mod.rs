pub mod parser;
pub mod response;

pub use parser::parse_response;
pub use response::{is_blank, LlmResponse};
