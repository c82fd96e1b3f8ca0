//! Kerberos authenticator and the AS exchange client behind it.
//!
//! The authenticator builds a one-realm configuration pointing the
//! credential's domain at the target as KDC, runs one AS exchange through a
//! [`KerberosClient`] and classifies the rendered error text. In enumeration
//! mode the pre-authentication etype is pinned to DES3 so the KDC's answer
//! discloses whether the principal exists and whether it requires
//! pre-authentication.
//!
//! [`AsExchangeClient`] is the production client: AS-REQ encoding comes from
//! `kerberos_asn1`, key derivation and the encrypted timestamp from
//! `kerberos_crypto`. It always sends PA-ENC-TIMESTAMP up front and never
//! negotiates FAST.
use std::io::{self, Read, Write};
use std::net::TcpStream;

use chrono::Utc;
use kerberos_asn1::{
    AsRep, AsReq, Asn1Object, EncryptedData, KdcReqBody, KrbError, PaData, PaEncTsEnc,
    PrincipalName,
};
use kerberos_constants::{etypes, kdc_options, key_usages, pa_data_types, principal_names};
use kerberos_crypto::new_kerberos_cipher;
use log::debug;

use crate::auth::{Attempt, AttemptResult, AuthError, Authenticator};
use crate::classify::{Verdict, classify_kerberos};
use crate::credential::Credential;

pub const KDC_PORT: u16 = 88;

// Legacy etypes, no local cipher in kerberos_crypto.
pub const DES_CBC_CRC: i32 = 1;
pub const DES_CBC_MD5: i32 = 3;
pub const DES3_CBC_SHA1_KD: i32 = 16;

/// Largest KDC reply accepted on the wire.
const MAX_REPLY_BYTES: usize = 1 << 20;

/// Minimal libdefaults + single realm, the equivalent of
/// `[realms] DOMAIN = { kdc = host:88 }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealmConfig {
    pub realm: String,
    pub kdc: String,
    /// Etype used to encrypt PA-ENC-TIMESTAMP.
    pub preauth_etype: i32,
    /// Etypes listed in the AS-REQ body, most preferred first.
    pub offered_etypes: Vec<i32>,
}

impl RealmConfig {
    pub fn new(realm: &str, host: &str) -> Self {
        Self {
            realm: realm.to_uppercase(),
            kdc: format!("{host}:{KDC_PORT}"),
            preauth_etype: etypes::AES256_CTS_HMAC_SHA1_96,
            offered_etypes: vec![
                etypes::AES256_CTS_HMAC_SHA1_96,
                etypes::AES128_CTS_HMAC_SHA1_96,
                etypes::RC4_HMAC,
            ],
        }
    }

    /// Constrain pre-authentication to DES3 and also offer the DES family,
    /// so DES-only accounts answer with an AS-REP instead of ETYPE_NOSUPP.
    pub fn for_enumeration(mut self) -> Self {
        self.preauth_etype = DES3_CBC_SHA1_KD;
        self.offered_etypes
            .extend([DES3_CBC_SHA1_KD, DES_CBC_MD5, DES_CBC_CRC]);
        self
    }
}

/// Why an AS-REP enc-part could not be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptFailure {
    /// A cipher exists for the etype but the key is wrong.
    VerificationFailed,
    /// Legacy DES-family enc-part we cannot verify.
    ChecksumIncorrect,
}

impl std::fmt::Display for DecryptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecryptFailure::VerificationFailed => f.write_str("integrity verification failed"),
            DecryptFailure::ChecksumIncorrect => f.write_str("integrity checksum incorrect"),
        }
    }
}

/// Failure of one AS exchange. The `Display` text is what the classifier
/// matches against, so its wording is load-bearing.
#[derive(Debug, thiserror::Error)]
pub enum KerberosError {
    #[error(
        "AS Exchange Error: failed sending AS_REQ to KDC: failed to communicate with KDC {kdc}: {source}"
    )]
    Unreachable { kdc: String, source: io::Error },
    #[error(
        "AS Exchange Error: kerberos error response from KDC: KRB Error: ({code}) {name} {description}"
    )]
    Kdc {
        code: i32,
        name: &'static str,
        description: &'static str,
    },
    #[error(
        "AS Exchange Error: AS_REP is not valid or client password/keytab incorrect < Decrypting_Error: error decrypting EncPart of AS_REP < Decrypting_Error: error decrypting AS_REP encrypted part: error decrypting: {0}"
    )]
    Decrypt(DecryptFailure),
    #[error("AS Exchange Error: unrecognised reply from KDC {kdc} ({len} bytes)")]
    Malformed { kdc: String, len: usize },
}

impl KerberosError {
    pub fn from_code(code: i32) -> Self {
        let (name, description) = krb_error_text(code);
        KerberosError::Kdc {
            code,
            name,
            description,
        }
    }
}

/// RFC 4120 error code names and descriptions.
pub fn krb_error_text(code: i32) -> (&'static str, &'static str) {
    match code {
        1 => ("KDC_ERR_NAME_EXP", "Client's entry in database has expired"),
        2 => ("KDC_ERR_SERVICE_EXP", "Server's entry in database has expired"),
        3 => ("KDC_ERR_BAD_PVNO", "Requested protocol version number not supported"),
        6 => (
            "KDC_ERR_C_PRINCIPAL_UNKNOWN",
            "Client not found in Kerberos database",
        ),
        7 => (
            "KDC_ERR_S_PRINCIPAL_UNKNOWN",
            "Server not found in Kerberos database",
        ),
        12 => ("KDC_ERR_POLICY", "KDC policy rejects request"),
        13 => ("KDC_ERR_BADOPTION", "KDC cannot accommodate requested option"),
        14 => (
            "KDC_ERR_ETYPE_NOSUPP",
            "KDC has no support for encryption type",
        ),
        16 => (
            "KDC_ERR_PADATA_TYPE_NOSUPP",
            "KDC has no support for padata type",
        ),
        18 => (
            "KDC_ERR_CLIENT_REVOKED",
            "Clients credentials have been revoked",
        ),
        23 => (
            "KDC_ERR_KEY_EXPIRED",
            "Password has expired - change password to reset",
        ),
        24 => (
            "KDC_ERR_PREAUTH_FAILED",
            "Pre-authentication information was invalid",
        ),
        25 => (
            "KDC_ERR_PREAUTH_REQUIRED",
            "Additional pre-authentication required",
        ),
        37 => ("KRB_AP_ERR_SKEW", "Clock skew too great"),
        41 => ("KRB_AP_ERR_MODIFIED", "Message stream modified"),
        60 => ("KRB_ERR_GENERIC", "Generic error"),
        68 => ("KDC_ERR_WRONG_REALM", "Reserved for future use"),
        _ => ("UNKNOWN_ERROR_CODE", "Unknown error code"),
    }
}

/// One AS exchange for a credential against a realm.
pub trait KerberosClient {
    fn login(&mut self, credential: &Credential, realm: &RealmConfig) -> Result<(), KerberosError>;
}

/// AS exchange over TCP. No timeout is set; the OS connect and read defaults
/// apply.
#[derive(Debug, Default, Clone, Copy)]
pub struct AsExchangeClient;

impl KerberosClient for AsExchangeClient {
    fn login(&mut self, credential: &Credential, realm: &RealmConfig) -> Result<(), KerberosError> {
        let request = build_as_req(credential, realm).build();
        let reply = exchange(&realm.kdc, &request)?;
        if let Ok((_, krb_error)) = KrbError::parse(&reply) {
            return Err(KerberosError::from_code(krb_error.error_code));
        }
        let (_, as_rep) = AsRep::parse(&reply).map_err(|_| KerberosError::Malformed {
            kdc: realm.kdc.clone(),
            len: reply.len(),
        })?;
        open_as_rep(credential, realm, &as_rep)
    }
}

fn build_as_req(credential: &Credential, realm: &RealmConfig) -> AsReq {
    let mut as_req = AsReq::default();
    as_req.req_body = KdcReqBody {
        kdc_options: (kdc_options::FORWARDABLE | kdc_options::RENEWABLE | kdc_options::RENEWABLE_OK)
            .into(),
        cname: Some(PrincipalName {
            name_type: principal_names::NT_PRINCIPAL,
            name_string: vec![credential.username.clone()],
        }),
        realm: realm.realm.clone(),
        sname: Some(PrincipalName {
            name_type: principal_names::NT_SRV_INST,
            name_string: vec!["krbtgt".to_string(), realm.realm.clone()],
        }),
        from: None,
        till: (Utc::now() + chrono::Duration::hours(10)).into(),
        rtime: None,
        nonce: rand::random(),
        etypes: realm.offered_etypes.clone(),
        addresses: None,
        enc_authorization_data: None,
        additional_tickets: None,
    };
    as_req.padata = Some(vec![timestamp_padata(credential, realm)]);
    as_req
}

fn timestamp_padata(credential: &Credential, realm: &RealmConfig) -> PaData {
    let etype = realm.preauth_etype;
    let cipher_text = match new_kerberos_cipher(etype) {
        Ok(cipher) => {
            let salt = cipher.generate_salt(&realm.realm, &credential.username);
            let key = cipher.generate_key_from_string(&credential.password, &salt);
            let timestamp = PaEncTsEnc::from(Utc::now());
            cipher.encrypt(
                &key,
                key_usages::KEY_USAGE_AS_REQ_TIMESTAMP,
                &timestamp.build(),
            )
        }
        // DES-family probe: the KDC judges the etype before the ciphertext.
        Err(_) => rand::random::<[u8; 32]>().to_vec(),
    };
    PaData::new(
        pa_data_types::PA_ENC_TIMESTAMP,
        EncryptedData::new(etype, None, cipher_text).build(),
    )
}

fn open_as_rep(
    credential: &Credential,
    realm: &RealmConfig,
    as_rep: &AsRep,
) -> Result<(), KerberosError> {
    let cipher = new_kerberos_cipher(as_rep.enc_part.etype)
        .map_err(|_| KerberosError::Decrypt(DecryptFailure::ChecksumIncorrect))?;
    let salt = cipher.generate_salt(&realm.realm, &credential.username);
    let key = cipher.generate_key_from_string(&credential.password, &salt);
    cipher
        .decrypt(
            &key,
            key_usages::KEY_USAGE_AS_REP_ENC_PART,
            &as_rep.enc_part.cipher,
        )
        .map_err(|_| KerberosError::Decrypt(DecryptFailure::VerificationFailed))?;
    Ok(())
}

/// Send one length-prefixed message over TCP and read the length-prefixed
/// reply.
fn exchange(kdc: &str, request: &[u8]) -> Result<Vec<u8>, KerberosError> {
    let unreachable = |source: io::Error| KerberosError::Unreachable {
        kdc: kdc.to_string(),
        source,
    };
    let mut stream = TcpStream::connect(kdc).map_err(unreachable)?;
    let len = u32::try_from(request.len())
        .map_err(|_| unreachable(io::Error::new(io::ErrorKind::InvalidInput, "AS_REQ too large")))?;
    stream.write_all(&len.to_be_bytes()).map_err(unreachable)?;
    stream.write_all(request).map_err(unreachable)?;

    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).map_err(unreachable)?;
    let reply_len = u32::from_be_bytes(len_buf) as usize;
    if reply_len > MAX_REPLY_BYTES {
        return Err(KerberosError::Malformed {
            kdc: kdc.to_string(),
            len: reply_len,
        });
    }
    let mut reply = vec![0u8; reply_len];
    stream.read_exact(&mut reply).map_err(unreachable)?;
    Ok(reply)
}

/// Kerberos variant of [`Authenticator`].
#[derive(Debug)]
pub struct KerberosAuthenticator<C> {
    client: C,
    enumerate: bool,
}

impl<C: KerberosClient> KerberosAuthenticator<C> {
    pub fn new(client: C, enumerate: bool) -> Self {
        Self { client, enumerate }
    }

    pub fn realm_config(&self, attempt: &Attempt<'_>) -> RealmConfig {
        let realm = RealmConfig::new(&attempt.credential.domain, attempt.target);
        if self.enumerate {
            realm.for_enumeration()
        } else {
            realm
        }
    }
}

impl<C: KerberosClient> Authenticator for KerberosAuthenticator<C> {
    fn login(&mut self, attempt: &Attempt<'_>) -> Result<AttemptResult, AuthError> {
        let realm = self.realm_config(attempt);
        debug!(
            "kerberos login {} via {}",
            attempt.credential.user_principal_name(),
            realm.kdc
        );
        let raw = match self.client.login(attempt.credential, &realm) {
            Ok(()) => None,
            Err(e) => {
                let text = e.to_string();
                debug!("{text}");
                Some(text)
            }
        };
        match classify_kerberos(raw.as_deref(), self.enumerate) {
            Verdict::ClockSkew => Err(AuthError::ClockSkew {
                host: attempt.target.to_string(),
            }),
            Verdict::Outcome(outcome) => Ok(AttemptResult::new(attempt, outcome, raw)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ServiceKind;
    use crate::outcome::Outcome;
    use std::net::TcpListener;

    /// Replays one canned error code (or success) and remembers the realm.
    struct Canned {
        code: Option<i32>,
        seen: Vec<RealmConfig>,
    }

    impl KerberosClient for Canned {
        fn login(&mut self, _: &Credential, realm: &RealmConfig) -> Result<(), KerberosError> {
            self.seen.push(realm.clone());
            match self.code {
                Some(code) => Err(KerberosError::from_code(code)),
                None => Ok(()),
            }
        }
    }

    fn run(code: Option<i32>, enumerate: bool) -> (Result<AttemptResult, AuthError>, RealmConfig) {
        let mut auth = KerberosAuthenticator::new(Canned { code, seen: vec![] }, enumerate);
        let cred = Credential::new("alice", "pw", "corp.local");
        let attempt = Attempt {
            target: "dc01",
            credential: &cred,
            service: ServiceKind::Kerberos,
        };
        let res = auth.login(&attempt);
        (res, auth.client.seen.remove(0))
    }

    #[test]
    fn realm_points_domain_at_target() {
        let (_, realm) = run(None, false);
        assert_eq!(realm.realm, "CORP.LOCAL");
        assert_eq!(realm.kdc, "dc01:88");
        assert_eq!(realm.preauth_etype, etypes::AES256_CTS_HMAC_SHA1_96);
    }

    #[test]
    fn enumeration_pins_des3_preauth() {
        let (_, realm) = run(None, true);
        assert_eq!(realm.preauth_etype, DES3_CBC_SHA1_KD);
        assert!(realm.offered_etypes.contains(&DES_CBC_MD5));
    }

    #[test]
    fn rendered_codes_classify_by_mode() {
        let cases = [
            (24, false, Outcome::Failed),
            (24, true, Outcome::UserExists),
            (6, true, Outcome::UserNotExist),
            (12, true, Outcome::UserExistsSmartcardRequired),
            (14, true, Outcome::UserExists),
            (18, false, Outcome::AccountLocked),
            (60, false, Outcome::Unclassified),
        ];
        for (code, enumerate, expected) in cases {
            let (res, _) = run(Some(code), enumerate);
            let res = res.unwrap();
            assert_eq!(res.outcome, expected, "code {code} enumerate {enumerate}");
            assert!(res.raw_error.unwrap().contains(krb_error_text(code).0));
        }
    }

    #[test]
    fn success_renders_positive_line() {
        let (res, _) = run(None, false);
        let res = res.unwrap();
        assert_eq!(res.outcome, Outcome::Success);
        assert_eq!(res.plain, "[+] dc01 CORP.LOCAL\\alice:pw = Success");
        assert!(res.raw_error.is_none());
    }

    #[test]
    fn clock_skew_is_an_auth_error() {
        let (res, _) = run(Some(37), true);
        match res {
            Err(AuthError::ClockSkew { host }) => assert_eq!(host, "dc01"),
            other => panic!("expected clock skew, got {other:?}"),
        }
    }

    #[test]
    fn decrypt_failures_render_distinct_tails() {
        let v = KerberosError::Decrypt(DecryptFailure::VerificationFailed).to_string();
        let c = KerberosError::Decrypt(DecryptFailure::ChecksumIncorrect).to_string();
        assert!(v.ends_with("integrity verification failed"));
        assert!(c.ends_with("integrity checksum incorrect"));
        assert_eq!(
            classify_kerberos(Some(&c), true),
            Verdict::Outcome(Outcome::UserExistsDesOnly)
        );
    }

    #[test]
    fn closed_port_is_network_error() {
        // Bind then drop to get a port nothing listens on.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let mut realm = RealmConfig::new("CORP", "127.0.0.1");
        realm.kdc = format!("127.0.0.1:{port}");
        let cred = Credential::new("alice", "pw", "corp");
        let err = AsExchangeClient.login(&cred, &realm).unwrap_err();
        assert!(matches!(err, KerberosError::Unreachable { .. }));
        assert_eq!(
            classify_kerberos(Some(&err.to_string()), false),
            Verdict::Outcome(Outcome::NetworkError)
        );
    }

    #[test]
    fn exchange_is_length_prefixed() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut len = [0u8; 4];
            sock.read_exact(&mut len).unwrap();
            let mut body = vec![0u8; u32::from_be_bytes(len) as usize];
            sock.read_exact(&mut body).unwrap();
            sock.write_all(&[0, 0, 0, 3, 0xde, 0xad, 0x00]).unwrap();
            body
        });
        let reply = exchange(&addr.to_string(), b"hello").unwrap();
        assert_eq!(reply, vec![0xde, 0xad, 0x00]);
        assert_eq!(server.join().unwrap(), b"hello".to_vec());
    }

    /// Accept one length-prefixed request and answer with `reply`.
    fn serve_once(reply: Vec<u8>) -> (RealmConfig, std::thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut len = [0u8; 4];
            sock.read_exact(&mut len).unwrap();
            let mut body = vec![0u8; u32::from_be_bytes(len) as usize];
            sock.read_exact(&mut body).unwrap();
            let len = u32::try_from(reply.len()).unwrap();
            sock.write_all(&len.to_be_bytes()).unwrap();
            sock.write_all(&reply).unwrap();
        });
        let mut realm = RealmConfig::new("CORP", "127.0.0.1");
        realm.kdc = addr.to_string();
        (realm, server)
    }

    fn as_rep_with(etype: i32) -> Vec<u8> {
        let mut as_rep = AsRep::default();
        as_rep.enc_part = EncryptedData::new(etype, None, vec![0u8; 64]);
        as_rep.build()
    }

    #[test]
    fn garbage_reply_is_malformed() {
        let (realm, server) = serve_once(vec![0x01, 0x02]);
        let cred = Credential::new("alice", "pw", "corp");
        let err = AsExchangeClient.login(&cred, &realm).unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, KerberosError::Malformed { len: 2, .. }));
    }

    #[test]
    fn krb_error_reply_is_rendered_with_its_code() {
        let mut krb_error = KrbError::default();
        krb_error.error_code = 24;
        let (realm, server) = serve_once(krb_error.build());
        let cred = Credential::new("alice", "pw", "corp");
        let err = AsExchangeClient.login(&cred, &realm).unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, KerberosError::Kdc { code: 24, .. }));
        let text = err.to_string();
        assert!(text.contains("KRB Error: (24) KDC_ERR_PREAUTH_FAILED"));
        assert_eq!(
            classify_kerberos(Some(&text), false),
            Verdict::Outcome(Outcome::Failed)
        );
        assert_eq!(
            classify_kerberos(Some(&text), true),
            Verdict::Outcome(Outcome::UserExists)
        );
    }

    #[test]
    fn des_as_rep_means_des_only_account() {
        let (realm, server) = serve_once(as_rep_with(DES_CBC_MD5));
        let realm = realm.for_enumeration();
        let cred = Credential::new("alice", "", "corp");
        let err = AsExchangeClient.login(&cred, &realm).unwrap_err();
        server.join().unwrap();

        assert!(matches!(
            err,
            KerberosError::Decrypt(DecryptFailure::ChecksumIncorrect)
        ));
        assert_eq!(
            classify_kerberos(Some(&err.to_string()), true),
            Verdict::Outcome(Outcome::UserExistsDesOnly)
        );
    }

    #[test]
    fn undecryptable_aes_as_rep_means_no_preauth() {
        let (realm, server) = serve_once(as_rep_with(etypes::AES256_CTS_HMAC_SHA1_96));
        let realm = realm.for_enumeration();
        let cred = Credential::new("alice", "", "corp");
        let err = AsExchangeClient.login(&cred, &realm).unwrap_err();
        server.join().unwrap();

        assert!(matches!(
            err,
            KerberosError::Decrypt(DecryptFailure::VerificationFailed)
        ));
        assert_eq!(
            classify_kerberos(Some(&err.to_string()), true),
            Verdict::Outcome(Outcome::UserExistsNoPreauth)
        );
    }
}
