pub mod config;
pub mod engine;
pub mod error;
pub mod mapping;
pub mod message;
pub mod notion;
pub mod record;
pub mod resolve;
pub mod slack;

mod http;

pub use error::{DutySyncError, Result};
