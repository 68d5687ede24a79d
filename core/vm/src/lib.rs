// dryrun/core/vm/src/lib.rs

// Reference interpreter, genesis and wallet for the sandbox
pub mod engine;
pub mod error;
pub mod gas;
pub mod genesis;
mod interop;
mod natives;
pub mod wallet;

pub use engine::ReferenceEngine;
pub use error::VmError;
pub use genesis::{build_genesis, GenesisConfig};
pub use wallet::KeyWallet;
