pub mod builder;
pub mod export;
pub mod loader;

pub use crate::domain::model::Settings;
pub use crate::utils::error::Result;
