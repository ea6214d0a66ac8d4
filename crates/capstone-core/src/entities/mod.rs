//! Entity structs for all Capstone domain objects.
//!
//! Each entity maps to a table in the libSQL database (see
//! `capstone-db/migrations/001_initial.sql`). All structs derive `Serialize`,
//! `Deserialize`, and `JsonSchema` for JSON output and schema validation.

mod actor;
mod artifact;
mod audit;
mod invitation;
mod notification;
mod request;
mod team;

pub use actor::Actor;
pub use artifact::Artifact;
pub use audit::AuditEntry;
pub use invitation::Invitation;
pub use notification::Notification;
pub use request::{ProjectRequest, RequestRevision};
pub use team::{Team, TeamOverview};
