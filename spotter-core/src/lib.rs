pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod numeric;
pub mod progress;
pub mod session;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::Config;
pub use error::{Result, SessionError};
pub use session::Session;
