use std::fmt;

use crate::crypto::cipher::RecordAlgorithm;
use crate::crypto::hash;
use crate::crypto::tls12::Prf;
use crate::enums::{CipherSuite, ProtocolVersion, SignatureAlgorithm, SignatureScheme};
use crate::msgs::handshake::KeyExchangeAlgorithm;

/// Common state for cipher suites.
pub struct CipherSuiteCommon {
    /// The TLS enumeration naming this cipher suite.
    pub suite: CipherSuite,

    /// Which hash function the suite uses with TLS 1.2.
    pub hash_provider: &'static dyn hash::Hash,
}

/// A cipher suite usable with TLS 1.0, 1.1 and 1.2.
///
/// All possible instances of this type are provided by the library in
/// the [`rust_crypto::ALL_CIPHER_SUITES`] array.
///
/// [`rust_crypto::ALL_CIPHER_SUITES`]: crate::crypto::rust_crypto::ALL_CIPHER_SUITES
pub struct TlsCipherSuite {
    /// Common cipher suite fields.
    pub common: CipherSuiteCommon,

    /// How to exchange/agree keys.
    pub kx: KeyExchangeAlgorithm,

    /// How to sign messages for authentication.
    ///
    /// Empty for suites that do not authenticate the server with a
    /// certificate: anonymous Diffie-Hellman, PSK, and SRP without RSA.
    pub sign: &'static [SignatureScheme],

    /// The earliest protocol version this suite may be negotiated at.
    pub min_version: ProtocolVersion,

    /// How to produce a [`Prf`] instance for this suite at TLS 1.2.
    pub prf_provider: &'static dyn Prf,

    /// The MD5/SHA-1 PRF used below TLS 1.2.
    pub legacy_prf_provider: &'static dyn Prf,

    /// The MD5+SHA-1 transcript hash used below TLS 1.2.
    pub legacy_hash_provider: &'static dyn hash::Hash,

    /// How to protect records.
    pub record_alg: &'static dyn RecordAlgorithm,
}

impl TlsCipherSuite {
    /// Resolve the set of supported [`SignatureScheme`]s from the
    /// offered signature schemes.  If we return an empty
    /// set, the handshake terminates.
    pub fn resolve_sig_schemes(&self, offered: &[SignatureScheme]) -> Vec<SignatureScheme> {
        self.sign
            .iter()
            .filter(|pref| offered.contains(pref))
            .cloned()
            .collect()
    }

    /// Return `true` if this suite may be negotiated at `version`.
    pub fn usable_for_version(&self, version: ProtocolVersion) -> bool {
        u16::from(version) >= u16::from(self.min_version)
    }

    /// Return `true` if this suite authenticates the server using a key
    /// of type `sig_alg`.
    pub fn usable_for_signature_algorithm(&self, sig_alg: SignatureAlgorithm) -> bool {
        self.sign
            .iter()
            .any(|scheme| scheme.sign() == sig_alg)
    }

    /// Does the server send a Certificate message for this suite?
    pub fn requires_server_cert(&self) -> bool {
        !self.sign.is_empty()
    }

    /// The PRF in force at `version`.
    pub(crate) fn prf_for(&self, version: ProtocolVersion) -> &'static dyn Prf {
        match version {
            ProtocolVersion::TLSv1_2 => self.prf_provider,
            _ => self.legacy_prf_provider,
        }
    }

    /// The transcript hash in force at `version`.
    pub(crate) fn transcript_hash_for(&self, version: ProtocolVersion) -> &'static dyn hash::Hash {
        match version {
            ProtocolVersion::TLSv1_2 => self.common.hash_provider,
            _ => self.legacy_hash_provider,
        }
    }

    /// Does this suite use elliptic curves, and so need the curve extensions?
    pub(crate) fn uses_ecc(&self) -> bool {
        matches!(
            self.kx,
            KeyExchangeAlgorithm::ECDHE | KeyExchangeAlgorithm::ECDHE_PSK
        )
    }

    /// Is this a pre-shared key suite?
    pub(crate) fn uses_psk(&self) -> bool {
        matches!(
            self.kx,
            KeyExchangeAlgorithm::PSK
                | KeyExchangeAlgorithm::DHE_PSK
                | KeyExchangeAlgorithm::ECDHE_PSK
        )
    }

    /// Is this an SRP suite?
    pub(crate) fn uses_srp(&self) -> bool {
        self.kx == KeyExchangeAlgorithm::SRP
    }
}

impl fmt::Debug for TlsCipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsCipherSuite")
            .field("suite", &self.common.suite)
            .field("kx", &self.kx)
            .field("min_version", &self.min_version)
            .finish()
    }
}

impl PartialEq for TlsCipherSuite {
    fn eq(&self, other: &Self) -> bool {
        self.common.suite == other.common.suite
    }
}

/// A cipher suite supported by tlsconnect.
pub type SupportedCipherSuite = &'static TlsCipherSuite;

/// Return a list of the ciphersuites in `all` with the suites
/// in `names` in the same order.
pub fn choose_ciphersuites_by_name(
    all: &[SupportedCipherSuite],
    names: &[CipherSuite],
) -> Vec<SupportedCipherSuite> {
    names
        .iter()
        .filter_map(|name| {
            all.iter()
                .find(|suite| suite.common.suite == *name)
                .copied()
        })
        .collect()
}

pub(crate) static TLS12_ECDSA_SCHEMES: &[SignatureScheme] = &[
    SignatureScheme::ECDSA_NISTP256_SHA256,
    SignatureScheme::ECDSA_SHA1_Legacy,
];

pub(crate) static TLS12_RSA_SCHEMES: &[SignatureScheme] = &[
    SignatureScheme::RSA_PKCS1_SHA256,
    SignatureScheme::RSA_PKCS1_SHA1,
];
