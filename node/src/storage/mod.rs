pub mod persistence;

pub use persistence::{PersistenceError, PersistenceManager, PersistenceResult, Snapshot};
