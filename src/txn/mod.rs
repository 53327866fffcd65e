// Transaction module - payments, application calls and atomic groups

mod builder;
mod codec;
mod group;
mod model;
mod validator;

pub use builder::*;
pub use codec::*;
pub use group::*;
pub use model::*;
pub use validator::*;
