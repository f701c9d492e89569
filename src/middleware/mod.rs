pub mod auth;

pub use auth::{AdminIdentity, MemberIdentity};
