//! Repository modules, one per aggregate. Each adds an `impl CapstoneService`
//! block with its public operations plus the row helpers other repos reuse
//! inside a transaction.

pub mod actor;
pub mod artifact;
pub mod audit;
pub mod invitation;
pub mod request;
pub mod team;
pub mod workflow;
