//! Protocol error classification.
//!
//! Client libraries report failures as human-readable text only, so outcomes
//! are chosen by substring containment against ordered `(fragment, verdict)`
//! tables. The first matching rule wins; text that matches nothing becomes
//! [`Outcome::Unclassified`]. Order within a table matters: specific fragments
//! must precede generic ones, and the enumeration table is consulted before
//! the normal-mode table.
use crate::outcome::Outcome;

/// Result of classifying one raw protocol response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Outcome(Outcome),
    /// The KDC clock is too far from ours; no attempt against it can succeed.
    ClockSkew,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub fragment: &'static str,
    pub verdict: Verdict,
}

const fn rule(fragment: &'static str, outcome: Outcome) -> Rule {
    Rule {
        fragment,
        verdict: Verdict::Outcome(outcome),
    }
}

pub const KDC_UNREACHABLE: &str = "AS_REQ to KDC: failed to communicate with KDC";
pub const CLOCK_SKEW: &str = "(37) KRB_AP_ERR_SKEW";
pub const CLIENT_REVOKED: &str = "KDC_ERR_CLIENT_REVOKED";
pub const PRINCIPAL_UNKNOWN: &str = "KDC_ERR_C_PRINCIPAL_UNKNOWN";
pub const PREAUTH_FAILED: &str = "KDC_ERR_PREAUTH_FAILED";
pub const KEY_EXPIRED: &str = "KDC_ERR_KEY_EXPIRED";
pub const POLICY_REJECTED: &str = "(12) KDC_ERR_POLICY KDC policy rejects request";
pub const ETYPE_NOT_SUPPORTED: &str =
    "(14) KDC_ERR_ETYPE_NOSUPP KDC has no support for encryption type";
pub const AS_REP_INVALID: &str = "AS_REP is not valid or client password/keytab incorrect";
pub const AS_REP_INTEGRITY_FAILED: &str =
    "error decrypting AS_REP encrypted part: error decrypting: integrity verification failed";
pub const AS_REP_CHECKSUM_INCORRECT: &str =
    "error decrypting AS_REP encrypted part: error decrypting: integrity checksum incorrect";

pub const LDAP_ACCOUNT_LOCKED: &str = "AcceptSecurityContext error, data 775";
pub const LDAP_BAD_PASSWORD: &str = "AcceptSecurityContext error, data 52e";
pub const LDAP_INVALID_CREDENTIALS: &str = "invalidCredentials";

/// Consulted before every other Kerberos table.
pub const KERBEROS_NETWORK_RULES: &[Rule] = &[rule(KDC_UNREACHABLE, Outcome::NetworkError)];

/// Existence disclosure, consulted only in enumeration mode.
pub const KERBEROS_ENUMERATION_RULES: &[Rule] = &[
    Rule {
        fragment: CLOCK_SKEW,
        verdict: Verdict::ClockSkew,
    },
    rule(CLIENT_REVOKED, Outcome::AccountLocked),
    rule(PRINCIPAL_UNKNOWN, Outcome::UserNotExist),
    rule(PREAUTH_FAILED, Outcome::UserExists),
    rule(AS_REP_INTEGRITY_FAILED, Outcome::UserExistsNoPreauth),
    rule(POLICY_REJECTED, Outcome::UserExistsSmartcardRequired),
    rule(ETYPE_NOT_SUPPORTED, Outcome::UserExists),
    rule(AS_REP_CHECKSUM_INCORRECT, Outcome::UserExistsDesOnly),
];

pub const KERBEROS_RULES: &[Rule] = &[
    Rule {
        fragment: CLOCK_SKEW,
        verdict: Verdict::ClockSkew,
    },
    rule(CLIENT_REVOKED, Outcome::AccountLocked),
    rule(PREAUTH_FAILED, Outcome::Failed),
    rule(PRINCIPAL_UNKNOWN, Outcome::Failed),
    rule(KEY_EXPIRED, Outcome::Failed),
    rule(AS_REP_INVALID, Outcome::Failed),
];

pub const LDAP_RULES: &[Rule] = &[
    rule(LDAP_ACCOUNT_LOCKED, Outcome::AccountLocked),
    rule(LDAP_BAD_PASSWORD, Outcome::Failed),
    rule(LDAP_INVALID_CREDENTIALS, Outcome::Failed),
];

/// First rule in `rules` whose fragment occurs in `raw`.
pub fn first_match(rules: &[Rule], raw: &str) -> Option<Verdict> {
    rules
        .iter()
        .find(|r| raw.contains(r.fragment))
        .map(|r| r.verdict)
}

/// Classify the result of a Kerberos AS exchange. `None` means the exchange
/// succeeded.
pub fn classify_kerberos(raw: Option<&str>, enumerate: bool) -> Verdict {
    let Some(raw) = raw else {
        return Verdict::Outcome(Outcome::Success);
    };
    let mut tables: Vec<&[Rule]> = vec![KERBEROS_NETWORK_RULES];
    if enumerate {
        tables.push(KERBEROS_ENUMERATION_RULES);
    }
    tables.push(KERBEROS_RULES);
    tables
        .into_iter()
        .find_map(|t| first_match(t, raw))
        .unwrap_or_else(|| unclassified("kerberos", raw))
}

/// Classify the result of an LDAP simple bind. `None` means the bind
/// succeeded.
pub fn classify_ldap(raw: Option<&str>) -> Outcome {
    let Some(raw) = raw else {
        return Outcome::Success;
    };
    match first_match(LDAP_RULES, raw).unwrap_or_else(|| unclassified("ldap", raw)) {
        Verdict::Outcome(o) => o,
        // No LDAP rule is fatal.
        Verdict::ClockSkew => Outcome::Unclassified,
    }
}

fn unclassified(protocol: &str, raw: &str) -> Verdict {
    log::warn!("unrecognised {protocol} error, recording as Failed: {raw}");
    Verdict::Outcome(Outcome::Unclassified)
}
