mod client;
mod config;
mod credentials;
mod error;
mod models;
mod storage;

pub mod api;
pub use client::*;
pub use config::*;
pub use credentials::*;
pub use error::*;
pub use models::*;
pub use storage::*;
