pub mod actor;
pub mod artifact;
pub mod audit;
pub mod certify;
pub mod dispatch;
pub mod init;
pub mod invite;
pub mod request;
pub mod shared;
pub mod sweep;
pub mod team;
