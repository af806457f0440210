pub mod cell;
pub mod config;
pub mod domain;
pub mod errors;
pub mod extract;
pub mod stream;

pub use cell::{decode_cell, decode_row};
pub use config::{AppConfig, ConfigError, LoadOptions};
pub use domain::account::{AccountNumber, AccountRecord};
pub use domain::session::SessionId;
pub use errors::ApplicationError;
pub use extract::extract_text;
pub use stream::{LineBuffer, StreamDecoder, StreamOutput};
