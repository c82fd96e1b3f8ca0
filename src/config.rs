//! Run configuration: option validation and list loading.
//!
//! [`Options`] is the raw operator input. [`Options::validate`] rejects
//! contradictory or incomplete input before anything touches the network;
//! [`RunConfig::load`] then reads the host and user files and freezes the
//! result.
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use crate::auth::ServiceKind;
use crate::credential::Credential;
use crate::io::read_list;
use crate::targets::TargetPicker;

pub const DEFAULT_SLEEP_SECS: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("choose either Kerberos only (-K) or LDAP only (-L), not both")]
    ConflictingServices,
    #[error("enumeration (-E) cannot be combined with LDAP only (-L)")]
    EnumerateWithLdap,
    #[error("enumeration (-E) cannot be combined with Kerberos only (-K)")]
    EnumerateWithKerberos,
    #[error("provide a host (-H) or a list of hosts (--hostfile)")]
    MissingHosts,
    #[error("provide a username (-U) or a list of usernames (--userfile)")]
    MissingUsers,
    #[error("provide a password (-P) or select enumeration (-E)")]
    MissingPassword,
    #[error("provide the fully qualified domain (-D)")]
    MissingDomain,
    #[error("sleep must be a non-negative number of seconds, got {0}")]
    InvalidSleep(f64),
    #[error("{} contains no entries", .0.display())]
    EmptyList(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub host: Option<String>,
    pub hostfile: Option<PathBuf>,
    pub user: Option<String>,
    pub userfile: Option<PathBuf>,
    pub domain: Option<String>,
    pub password: Option<String>,
    pub output: Option<PathBuf>,
    pub sleep: f64,
    pub enumerate: bool,
    pub kerberos_only: bool,
    pub ldap_only: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            host: None,
            hostfile: None,
            user: None,
            userfile: None,
            domain: None,
            password: None,
            output: None,
            sleep: DEFAULT_SLEEP_SECS,
            enumerate: false,
            kerberos_only: false,
            ldap_only: false,
        }
    }
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn given(value: &Option<String>) -> bool {
    trimmed(value).is_some()
}

impl Options {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kerberos_only && self.ldap_only {
            return Err(ConfigError::ConflictingServices);
        }
        if self.enumerate && self.ldap_only {
            return Err(ConfigError::EnumerateWithLdap);
        }
        if self.enumerate && self.kerberos_only {
            return Err(ConfigError::EnumerateWithKerberos);
        }
        if !given(&self.host) && self.hostfile.is_none() {
            return Err(ConfigError::MissingHosts);
        }
        if !given(&self.user) && self.userfile.is_none() {
            return Err(ConfigError::MissingUsers);
        }
        if !given(&self.password) && !self.enumerate {
            return Err(ConfigError::MissingPassword);
        }
        if !given(&self.domain) {
            return Err(ConfigError::MissingDomain);
        }
        if !self.sleep.is_finite() || self.sleep < 0.0 {
            return Err(ConfigError::InvalidSleep(self.sleep));
        }
        Ok(())
    }

    /// Services to rotate through, in rotation order.
    pub fn services(&self) -> Vec<ServiceKind> {
        if self.enumerate || self.kerberos_only {
            vec![ServiceKind::Kerberos]
        } else if self.ldap_only {
            vec![ServiceKind::Ldap]
        } else {
            vec![ServiceKind::Kerberos, ServiceKind::Ldap]
        }
    }
}

/// Validated, loaded, immutable run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub targets: TargetPicker,
    pub usernames: Vec<String>,
    /// Password and domain shared by every attempt; username left empty.
    pub credential: Credential,
    pub services: Vec<ServiceKind>,
    pub enumerate: bool,
    pub sleep: Duration,
    pub output: Option<PathBuf>,
}

impl RunConfig {
    pub fn load(opts: &Options) -> Result<Self> {
        opts.validate()?;

        let single_host = trimmed(&opts.host);
        let targets = match &opts.hostfile {
            Some(path) => {
                let from_file = read_list(path)?;
                if from_file.is_empty() {
                    return Err(ConfigError::EmptyList(path.clone()).into());
                }
                let mut hosts: Vec<String> = single_host.into_iter().collect();
                hosts.extend(from_file);
                TargetPicker::Random(hosts)
            }
            None => TargetPicker::Fixed(single_host.ok_or(ConfigError::MissingHosts)?),
        };

        let single_user = trimmed(&opts.user);
        let mut usernames: Vec<String> = Vec::new();
        if let Some(path) = &opts.userfile {
            let from_file = read_list(path)?;
            if from_file.is_empty() && single_user.is_none() {
                return Err(ConfigError::EmptyList(path.clone()).into());
            }
            usernames.extend(from_file);
        }
        usernames.extend(single_user);

        let password = opts.password.clone().unwrap_or_default();
        let domain = opts.domain.clone().unwrap_or_default();
        let config = Self {
            targets,
            usernames,
            credential: Credential::new("", &password, &domain),
            services: opts.services(),
            enumerate: opts.enumerate,
            sleep: Duration::from_secs_f64(opts.sleep),
            output: opts.output.clone(),
        };
        log::debug!(
            "domain {} usernames {} hosts {:?} services {:?}",
            config.credential.domain,
            config.usernames.len(),
            config.targets.hosts(),
            config.services
        );
        Ok(config)
    }
}
