use std::fmt::Debug;
use std::sync::Arc;

use pki_types::CertificateDer;

use crate::enums::{SignatureAlgorithm, SignatureScheme};
use crate::error::Error;

/// An abstract signing key.
pub trait SigningKey: Debug + Send + Sync {
    /// Choose a `SignatureScheme` from those offered, for TLS 1.2.
    ///
    /// Expresses the choice by returning something that implements `Signer`,
    /// using the chosen scheme.
    fn choose_scheme(&self, offered: &[SignatureScheme]) -> Option<Box<dyn Signer>>;

    /// The signer used before TLS 1.2, where the hash is fixed by the key type:
    /// PKCS#1 v1.5 over `MD5 || SHA1` without a `DigestInfo` for RSA, and
    /// SHA-1 for ECDSA.
    fn legacy_signer(&self) -> Option<Box<dyn Signer>>;

    /// What kind of key we have.
    fn algorithm(&self) -> SignatureAlgorithm;
}

/// A thing that can sign a message.
pub trait Signer: Debug + Send + Sync {
    /// Signs `message` using the selected scheme.
    ///
    /// `message` is not hashed; the signer applies the scheme's hash.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, Error>;

    /// Reveals which scheme will be used when you call `sign()`.
    ///
    /// Legacy signers report the closest TLS 1.2 scheme.
    fn scheme(&self) -> SignatureScheme;
}

/// A packaged-together certificate chain and matching `SigningKey`.
#[derive(Clone, Debug)]
pub struct CertifiedKey {
    /// The certificate chain.
    pub cert: Vec<CertificateDer<'static>>,

    /// The certified key.
    pub key: Arc<dyn SigningKey>,
}

impl CertifiedKey {
    /// Make a new CertifiedKey, with the given chain and key.
    ///
    /// The cert chain must not be empty. The first certificate in the chain
    /// must be the end-entity certificate.
    pub fn new(cert: Vec<CertificateDer<'static>>, key: Arc<dyn SigningKey>) -> Self {
        Self { cert, key }
    }

    /// The end-entity certificate.
    pub fn end_entity_cert(&self) -> Result<&CertificateDer<'static>, Error> {
        self.cert
            .first()
            .ok_or(Error::NoCertificatesPresented)
    }
}
