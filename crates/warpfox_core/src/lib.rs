pub mod bootstrap;
pub mod build;
pub mod cache;
pub mod download;
pub mod error;
pub mod extract;
pub mod manifest;
pub mod process;
pub mod runtime;

pub use error::BuildError;
