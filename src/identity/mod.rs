// Identity module - Ed25519 keys and account addresses

mod address;
mod keys;

pub use address::*;
pub use keys::*;
