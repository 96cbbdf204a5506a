// core.rs splits responsibilities into submodules: the generic hash-linked
// arena, the transaction payload, and block validation.
pub mod chain;
pub mod ledger;
pub mod validation;

pub use chain::*;
pub use ledger::*;
pub use validation::*;
