pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod summary;
pub mod tsv;

pub use config::RunConfig;
pub use error::GapError;
pub use pipeline::run;
pub use summary::RunSummary;
