//! Deterministic random number generation
//!
//! Every stochastic draw in the simulator (roster sampling, price noise,
//! audit selection, misreporting, Monte Carlo parameter draws) goes through
//! an [`RngManager`] owned by exactly one run or one subsystem of a run.
//! There is no process-global randomness.

mod xorshift;

pub use xorshift::{derive_seed, RngManager};
