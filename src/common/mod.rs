//! Common utilities and types shared across the application.

pub mod embed;
pub mod error;

pub use embed::Embed;
