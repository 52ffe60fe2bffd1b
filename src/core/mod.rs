pub mod batch;
pub mod columns;
pub mod engine;
pub mod input;
pub mod layer;
pub mod lookup;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod response;

pub use crate::domain::ports::{ConfigProvider, Pipeline, ServiceClient, Storage};
pub use crate::utils::error::Result;
