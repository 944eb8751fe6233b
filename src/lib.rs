pub mod cache;
pub mod config;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod loader;
pub mod merge;
pub mod pipeline;
pub mod rng;
pub mod shuffle;
pub mod util;

pub use config::PipelineConfig;
pub use dataset::{NotMnist, Split};
pub use error::{PipelineError, Result};
