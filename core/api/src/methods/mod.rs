// dryrun/core/api/src/methods/mod.rs

pub mod session;

pub use session::SessionApi;
