//! LDAP authenticator: TLS connection to the directory, then a simple bind as
//! `user@DOMAIN`.
use ldap3::{LdapConn, LdapConnSettings};
use log::debug;

use crate::auth::{Attempt, AttemptResult, AuthError, Authenticator};
use crate::classify::classify_ldap;
use crate::outcome::Outcome;

pub const LDAPS_PORT: u16 = 636;

#[derive(Debug, thiserror::Error)]
pub enum LdapError {
    #[error("LDAP connection to {url} failed: {reason}")]
    Dial { url: String, reason: String },
    #[error("{0}")]
    Bind(String),
}

/// The three directory calls an attempt needs.
pub trait LdapClient {
    type Conn;

    fn dial_tls(&mut self, host: &str) -> Result<Self::Conn, LdapError>;
    fn start_tls(&mut self, conn: &mut Self::Conn) -> Result<(), LdapError>;
    fn bind(&mut self, conn: &mut Self::Conn, dn: &str, password: &str) -> Result<(), LdapError>;
}

/// `ldap3` synchronous client. Certificates are not verified: domain
/// controllers commonly present internal-CA certificates.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ldap3Client;

impl LdapClient for Ldap3Client {
    type Conn = LdapConn;

    fn dial_tls(&mut self, host: &str) -> Result<LdapConn, LdapError> {
        let url = format!("ldaps://{host}:{LDAPS_PORT}");
        let settings = LdapConnSettings::new().set_no_tls_verify(true);
        LdapConn::with_settings(settings, &url).map_err(|e| LdapError::Dial {
            url,
            reason: e.to_string(),
        })
    }

    fn start_tls(&mut self, _conn: &mut LdapConn) -> Result<(), LdapError> {
        // ldaps is TLS from the first byte; ldap3 only negotiates StartTLS at connect.
        debug!("session already TLS-wrapped, skipping StartTLS");
        Ok(())
    }

    fn bind(&mut self, conn: &mut LdapConn, dn: &str, password: &str) -> Result<(), LdapError> {
        let result = conn
            .simple_bind(dn, password)
            .and_then(|r| r.success())
            .map(|_| ())
            .map_err(|e| LdapError::Bind(e.to_string()));
        let _ = conn.unbind();
        result
    }
}

/// LDAP variant of [`Authenticator`].
#[derive(Debug)]
pub struct LdapAuthenticator<C> {
    client: C,
}

impl<C: LdapClient> LdapAuthenticator<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

impl<C: LdapClient> Authenticator for LdapAuthenticator<C> {
    fn login(&mut self, attempt: &Attempt<'_>) -> Result<AttemptResult, AuthError> {
        let dn = attempt.credential.user_principal_name();
        debug!("ldap bind {} on {}", dn, attempt.target);

        let mut conn = match self.client.dial_tls(attempt.target) {
            Ok(conn) => conn,
            Err(e) => {
                let text = e.to_string();
                debug!("{text}");
                return Ok(AttemptResult::new(attempt, Outcome::NetworkError, Some(text)));
            }
        };
        if let Err(e) = self.client.start_tls(&mut conn) {
            debug!("StartTLS failed, continuing: {e}");
        }
        let raw = match self.client.bind(&mut conn, &dn, &attempt.credential.password) {
            Ok(()) => None,
            Err(e) => {
                let text = e.to_string();
                debug!("{text}");
                Some(text)
            }
        };
        Ok(AttemptResult::new(attempt, classify_ldap(raw.as_deref()), raw))
    }
}
