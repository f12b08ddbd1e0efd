pub mod manager;
pub mod tx;

pub use manager::DatabaseError;
pub use tx::{classify, Outcome, ScopedTx};
