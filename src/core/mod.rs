pub mod cache;
pub mod calculator;
pub mod etl;
pub mod pipeline;
pub mod projection;
pub mod scenarios;

pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
