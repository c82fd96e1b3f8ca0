pub mod auth;
pub mod classify;
pub mod config;
pub mod credential;
pub mod export;
pub mod io;
pub mod kerberos;
pub mod ldap;
pub mod outcome;
pub mod prompt;
pub mod report;
pub mod scheduler;
pub mod targets;

pub mod prelude {
    pub use crate::auth::{Attempt, AttemptResult, Authenticator, Dispatch, ServiceKind};
    pub use crate::credential::Credential;
    pub use crate::outcome::Outcome;
}
