// Client module - Transaction builder/submitter
// Builds round transactions, submits them to a node and waits for finality

mod node;
mod operations;

pub use node::*;
pub use operations::*;
