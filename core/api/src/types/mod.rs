// dryrun/core/api/src/types/mod.rs

pub mod error;
pub mod params;

pub use error::ApiError;
pub use params::ParamList;
