//! Credential data model for a single authentication attempt.
//!
//! A run shares one password and one domain across every username, so a
//! `Credential` is cheap to build per attempt from the run's template via
//! [`Credential::for_user`].

/// The identity submitted to an authenticator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
    /// Always uppercase; doubles as the Kerberos realm.
    pub domain: String,
}

impl Credential {
    pub fn new(username: &str, password: &str, domain: &str) -> Self {
        Self {
            username: username.trim().to_string(),
            password: password.to_string(),
            domain: domain.trim().to_uppercase(),
        }
    }

    /// Same password and domain, different username.
    pub fn for_user(&self, username: &str) -> Self {
        Self {
            username: username.trim().to_string(),
            password: self.password.clone(),
            domain: self.domain.clone(),
        }
    }

    /// `DOMAIN\user`, the down-level logon name used in result lines.
    pub fn down_level_logon_name(&self) -> String {
        format!("{}\\{}", self.domain, self.username)
    }

    /// `user@DOMAIN`, the bind name used against the directory.
    pub fn user_principal_name(&self) -> String {
        format!("{}@{}", self.username, self.domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_is_uppercased_and_names_derived() {
        let c = Credential::new("alice", "Winter2024!", "corp.example.com");
        assert_eq!(c.domain, "CORP.EXAMPLE.COM");
        assert_eq!(c.down_level_logon_name(), "CORP.EXAMPLE.COM\\alice");
        assert_eq!(c.user_principal_name(), "alice@CORP.EXAMPLE.COM");
    }

    #[test]
    fn for_user_keeps_password_and_domain() {
        let template = Credential::new("", "pw", "corp");
        let bob = template.for_user(" bob ");
        assert_eq!(bob.username, "bob");
        assert_eq!(bob.password, "pw");
        assert_eq!(bob.domain, "CORP");
    }
}
