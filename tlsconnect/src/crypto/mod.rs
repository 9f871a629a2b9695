use std::fmt::Debug;
use std::sync::Arc;

use pki_types::{CertificateDer, PrivateKeyDer};
use zeroize::Zeroize;

use crate::error::Error;
use crate::msgs::enums::NamedGroup;
use crate::suites::SupportedCipherSuite;
pub use crate::webpki::WebPkiSupportedAlgorithms;

/// RustCrypto-based CryptoProvider.
pub mod rust_crypto;

/// TLS message encryption/decryption interfaces.
pub mod cipher;

/// Hashing interfaces.
pub mod hash;

/// HMAC interfaces.
pub mod hmac;

/// Message signing interfaces.
pub mod signer;

/// The TLS pseudo-random function.
pub mod tls12;

pub use crate::msgs::handshake::KeyExchangeAlgorithm;
pub use crate::rand::GetRandomFailed;

/// Controls core cryptography used by tlsconnect.
///
/// This crate comes with one built-in option, [`rust_crypto::default_provider()`],
/// built on the RustCrypto crates.
///
/// The handshake only ever reaches cryptography through this structure:
/// key agreement starts from `kx_groups` or `finite_field`, RSA key
/// transport goes through `key_transport`, SRP through `srp`, signatures
/// are checked with `signature_verification_algorithms`, and the PRF and
/// record protection come from the chosen cipher suite.
///
/// Every field is public so a custom provider can be assembled from the
/// default one:
///
/// ```
/// use tlsconnect::crypto::rust_crypto;
///
/// let mut provider = rust_crypto::default_provider();
/// provider
///     .cipher_suites
///     .retain(|suite| suite.common.suite != tlsconnect::CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA);
/// ```
#[derive(Debug, Clone)]
pub struct CryptoProvider {
    /// List of supported ciphersuites, in preference order -- the first element
    /// is the highest priority.
    pub cipher_suites: Vec<SupportedCipherSuite>,

    /// List of supported elliptic-curve key exchange groups, in preference order.
    pub kx_groups: Vec<&'static dyn SupportedKxGroup>,

    /// Finite-field Diffie-Hellman over server-chosen parameters.
    pub finite_field: &'static dyn FiniteFieldDh,

    /// RSA encryption of the pre-master secret to the server certificate key.
    pub key_transport: &'static dyn KeyTransport,

    /// The client side of the SRP exchange.
    pub srp: &'static dyn SrpClient,

    /// List of signature verification algorithms for use with webpki.
    ///
    /// These are used for both certificate chain verification and handshake signature verification.
    pub signature_verification_algorithms: WebPkiSupportedAlgorithms,

    /// Source of cryptographically secure random numbers.
    pub secure_random: &'static dyn SecureRandom,

    /// Provider for loading private [SigningKey]s from [PrivateKeyDer].
    ///
    /// [SigningKey]: signer::SigningKey
    pub key_provider: &'static dyn KeyProvider,
}

impl CryptoProvider {
    /// The kx group with the given name, if supported.
    pub(crate) fn find_kx_group(&self, name: NamedGroup) -> Option<&'static dyn SupportedKxGroup> {
        self.kx_groups
            .iter()
            .find(|group| group.name() == name)
            .copied()
    }
}

/// A source of cryptographically secure randomness.
pub trait SecureRandom: Send + Sync + Debug {
    /// Fill the given buffer with random bytes.
    ///
    /// The bytes must be sourced from a cryptographically secure random number
    /// generator seeded with good quality, secret entropy.
    fn fill(&self, buf: &mut [u8]) -> Result<(), GetRandomFailed>;
}

/// A mechanism for loading private [SigningKey]s from [PrivateKeyDer].
///
/// [SigningKey]: signer::SigningKey
pub trait KeyProvider: Send + Sync + Debug {
    /// Decode and validate a private signing key from `key_der`.
    ///
    /// Return an error if the key type encoding is not supported, or if the key fails validation.
    fn load_private_key(
        &self,
        key_der: PrivateKeyDer<'static>,
    ) -> Result<Arc<dyn signer::SigningKey>, Error>;
}

/// A supported elliptic-curve key exchange group.
///
/// This has a TLS-level name expressed using the [`NamedGroup`] enum, and
/// a function which produces a [`ActiveKeyExchange`].
pub trait SupportedKxGroup: Send + Sync + Debug {
    /// Start a key exchange.
    ///
    /// This will prepare an ephemeral secret key in the supported group, and a corresponding
    /// public key. The key exchange can be completed by calling [ActiveKeyExchange::complete]
    /// or discarded.
    ///
    /// # Errors
    ///
    /// This can fail if the random source fails during ephemeral key generation.
    fn start(&self, secure_random: &dyn SecureRandom)
        -> Result<Box<dyn ActiveKeyExchange>, Error>;

    /// Named group the SupportedKxGroup operates in.
    fn name(&self) -> NamedGroup;
}

/// Finite-field Diffie-Hellman, where the server chooses the group.
pub trait FiniteFieldDh: Send + Sync + Debug {
    /// Start a key exchange in the group with prime `p` and generator `g`.
    ///
    /// Fails with [`PeerMisbehaved::InvalidKeyShare`](crate::PeerMisbehaved)
    /// if `g` is outside `[2, p-2]`.
    fn start(
        &self,
        p: &[u8],
        g: &[u8],
        secure_random: &dyn SecureRandom,
    ) -> Result<Box<dyn ActiveKeyExchange>, Error>;
}

/// An in-progress key exchange.
pub trait ActiveKeyExchange: Send + Sync {
    /// Completes the key exchange, given the peer's public key.
    ///
    /// The peer's public value is validated here; an unacceptable value is
    /// [`PeerMisbehaved::InvalidKeyShare`](crate::PeerMisbehaved).
    ///
    /// This consumes and so terminates the [`ActiveKeyExchange`].
    fn complete(self: Box<Self>, peer_pub_key: &[u8]) -> Result<SharedSecret, Error>;

    /// Return the public key being used.
    fn pub_key(&self) -> &[u8];

    /// Return the group being used, or `None` for finite-field groups
    /// chosen by the server.
    fn group(&self) -> Option<NamedGroup>;
}

/// RSA key transport of the pre-master secret.
pub trait KeyTransport: Send + Sync + Debug {
    /// Encrypt `pre_master` with PKCS#1 v1.5 padding to the public key in
    /// the certificate `end_entity`.
    fn encrypt_pre_master(
        &self,
        end_entity: &CertificateDer<'_>,
        pre_master: &[u8],
        secure_random: &dyn SecureRandom,
    ) -> Result<Vec<u8>, Error>;
}

/// Inputs to the client side of an SRP exchange (RFC 5054).
pub struct SrpInputs<'a> {
    /// The group prime `N`.
    pub n: &'a [u8],
    /// The group generator `g`.
    pub g: &'a [u8],
    /// The user's salt `s`.
    pub salt: &'a [u8],
    /// The server's public value `B`.
    pub server_public: &'a [u8],
    /// The user name `I`.
    pub identity: &'a [u8],
    /// The password `P`.
    pub password: &'a [u8],
}

/// The outcome of the client side of an SRP exchange.
pub struct SrpExchange {
    /// The client's public value `A`, unpadded.
    pub client_public: Vec<u8>,
    /// The premaster secret `S`, unpadded.
    pub premaster: SharedSecret,
}

/// The client side of the SRP exchange (RFC 5054, with SHA-1).
pub trait SrpClient: Send + Sync + Debug {
    /// Compute `A` and the premaster secret.
    ///
    /// Fails with [`PeerMisbehaved::InvalidSrpPublicValue`](crate::PeerMisbehaved)
    /// if `B mod N` is zero.
    fn exchange(
        &self,
        inputs: &SrpInputs<'_>,
        secure_random: &dyn SecureRandom,
    ) -> Result<SrpExchange, Error>;
}

/// The result from `ActiveKeyExchange::complete` as a value.
///
/// The contents are zeroed when this is dropped.
pub struct SharedSecret {
    buf: Vec<u8>,
    offset: usize,
}

impl SharedSecret {
    /// Returns the shared secret as a slice of bytes.
    pub fn secret_bytes(&self) -> &[u8] {
        &self.buf[self.offset..]
    }

    /// Removes leading zeros from `secret_bytes()` by adjusting the `offset`.
    ///
    /// This is how finite-field Diffie-Hellman pre-master secrets are formed.
    pub(crate) fn strip_leading_zeros(&mut self) {
        let start = self
            .buf
            .iter()
            .take_while(|&&b| b == 0)
            .count();
        self.offset = start;
    }
}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.buf.zeroize();
    }
}

impl From<&[u8]> for SharedSecret {
    fn from(source: &[u8]) -> Self {
        Self {
            buf: source.to_vec(),
            offset: 0,
        }
    }
}

impl From<Vec<u8>> for SharedSecret {
    fn from(buf: Vec<u8>) -> Self {
        Self { buf, offset: 0 }
    }
}
