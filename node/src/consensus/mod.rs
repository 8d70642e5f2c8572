pub mod resolver;

pub use resolver::{run_periodic_resolution, Candidate, ConsensusResolver};
