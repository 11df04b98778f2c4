//! Non-reversible parallel tempering (§3, §4.E–§4.G): the replica fleet,
//! the swap engine, the ladder adaptor, and the controller that drives them.

pub mod controller;
pub mod ladder;
pub mod replica;
pub mod swap;

pub use controller::{NrptOptions, NrptOutcome, run};
pub use ladder::{MonotoneSpline, communication_barrier, update_betas};
pub use replica::Replica;
pub use swap::{Parity, sweep};
