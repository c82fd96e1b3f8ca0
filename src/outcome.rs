//! Semantic outcome of one authentication attempt.
//!
//! Every attempt ends in exactly one [`Outcome`]. The label is the text that
//! ends each result line (`... = <label>`); the marker is `[+]` for outcomes
//! that reveal something useful (valid password, existing account) and `[-]`
//! otherwise.
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Outcome {
    Success,
    Failed,
    AccountLocked,
    UserExists,
    UserNotExist,
    UserExistsNoPreauth,
    UserExistsSmartcardRequired,
    /// No pre-authentication required and the account only holds DES keys.
    UserExistsDesOnly,
    NetworkError,
    /// Protocol error text that matched no known fragment.
    Unclassified,
}

impl Outcome {
    pub const ALL: [Outcome; 10] = [
        Outcome::Success,
        Outcome::Failed,
        Outcome::AccountLocked,
        Outcome::UserExists,
        Outcome::UserNotExist,
        Outcome::UserExistsNoPreauth,
        Outcome::UserExistsSmartcardRequired,
        Outcome::UserExistsDesOnly,
        Outcome::NetworkError,
        Outcome::Unclassified,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Outcome::Success => "Success",
            Outcome::Failed | Outcome::Unclassified => "Failed",
            Outcome::AccountLocked => "User's Account Locked",
            Outcome::UserExists => "User Exist",
            Outcome::UserNotExist => "User Does Not Exist",
            Outcome::UserExistsNoPreauth => "User Exist - But Does Not Require Preauth",
            Outcome::UserExistsSmartcardRequired => "User Exist - But Smartcard is Required",
            Outcome::UserExistsDesOnly => {
                "User Exist - But Only Allows Kerberos DES Encryption and Does Not Require Preauth"
            }
            Outcome::NetworkError => "Network Error",
        }
    }

    /// True for outcomes printed with the `[+]` marker.
    pub fn is_positive(self) -> bool {
        matches!(
            self,
            Outcome::Success
                | Outcome::UserExists
                | Outcome::UserExistsNoPreauth
                | Outcome::UserExistsSmartcardRequired
                | Outcome::UserExistsDesOnly
        )
    }

    pub fn marker(self) -> &'static str {
        if self.is_positive() { "[+]" } else { "[-]" }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
