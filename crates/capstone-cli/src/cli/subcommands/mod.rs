pub mod actor;
pub mod artifact;
pub mod invite;
pub mod request;
pub mod team;

pub use actor::ActorCommands;
pub use artifact::ArtifactCommands;
pub use invite::InviteCommands;
pub use request::RequestCommands;
pub use team::TeamCommands;
