//! Authenticator capability shared by the Kerberos and LDAP variants.
//!
//! An authenticator performs one exchange for one [`Attempt`] and turns the
//! raw client result into an [`AttemptResult`]. It never retries and never
//! talks to the operator; continue/abort decisions belong to the scheduler.
use std::fmt;

use crate::credential::Credential;
use crate::outcome::Outcome;
use crate::report::{render_display, render_plain};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Kerberos,
    Ldap,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceKind::Kerberos => f.write_str("KERB"),
            ServiceKind::Ldap => f.write_str("LDAP"),
        }
    }
}

/// One (host, credential, service) submission. Not retained after its
/// outcome is produced.
#[derive(Debug, Clone, Copy)]
pub struct Attempt<'a> {
    pub target: &'a str,
    pub credential: &'a Credential,
    pub service: ServiceKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptResult {
    pub outcome: Outcome,
    pub display: String,
    pub plain: String,
    /// Raw client error text, if the exchange failed.
    pub raw_error: Option<String>,
}

impl AttemptResult {
    pub fn new(attempt: &Attempt<'_>, outcome: Outcome, raw_error: Option<String>) -> Self {
        Self {
            outcome,
            display: render_display(attempt.target, attempt.credential, outcome),
            plain: render_plain(attempt.target, attempt.credential, outcome),
            raw_error,
        }
    }
}

/// Conditions that end the whole run rather than a single attempt.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("clock skew between this host and KDC {host} is too great")]
    ClockSkew { host: String },
}

pub trait Authenticator {
    fn login(&mut self, attempt: &Attempt<'_>) -> Result<AttemptResult, AuthError>;
}

/// Both authenticator variants, selected per attempt by service kind.
pub struct Dispatch {
    kerberos: Box<dyn Authenticator>,
    ldap: Box<dyn Authenticator>,
}

impl Dispatch {
    pub fn new(kerberos: Box<dyn Authenticator>, ldap: Box<dyn Authenticator>) -> Self {
        Self { kerberos, ldap }
    }

    pub fn login(&mut self, attempt: &Attempt<'_>) -> Result<AttemptResult, AuthError> {
        match attempt.service {
            ServiceKind::Kerberos => self.kerberos.login(attempt),
            ServiceKind::Ldap => self.ldap.login(attempt),
        }
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch").finish_non_exhaustive()
    }
}
