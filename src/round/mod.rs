// Round module - THE SETTLEMENT STATE MACHINE
// Creation, match registration and disposal of a single matching round

mod error;
mod machine;
mod program;
mod schema;
mod state;

pub use error::RoundError;
pub use machine::{DisposalKind, Environment, InnerPayment, MatchBundle, RoundMachine, Settlement};
pub use program::{ProgramOutcome, RoundProgram, MATCH_METHOD};
pub use schema::{keys, GlobalState, SchemaError, StateValue, ROUND_GLOBAL_SCHEMA, ROUND_LOCAL_SCHEMA};
pub use state::{Phase, Round, RoundParams};
