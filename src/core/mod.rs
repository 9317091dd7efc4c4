pub mod assembly;
pub mod engine;
pub mod pipeline;
pub mod problem;
pub mod render;
pub mod solver;

pub use crate::domain::ports::{CatalogSource, ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
