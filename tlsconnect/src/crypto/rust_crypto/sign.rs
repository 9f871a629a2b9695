use std::sync::Arc;

use md5::Md5;
use p256::ecdsa::signature::hazmat::PrehashSigner;
use pki_types::PrivateKeyDer;
use pkcs8::DecodePrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::{pkcs1v15, Pkcs1v15Sign, RsaPrivateKey};
use sha1::{Digest, Sha1};
use sha2::Sha256;
use signature::{SignatureEncoding, Signer as _};

use crate::crypto::signer::{Signer, SigningKey};
use crate::enums::{SignatureAlgorithm, SignatureScheme};
use crate::error::Error;

/// Load a private key in any format this provider understands: PKCS#8
/// RSA or P-256, PKCS#1 RSA, or SEC1 P-256.
pub(super) fn any_supported_type(der: &PrivateKeyDer<'_>) -> Result<Arc<dyn SigningKey>, Error> {
    match der {
        PrivateKeyDer::Pkcs8(pkcs8) => {
            if let Ok(key) = RsaPrivateKey::from_pkcs8_der(pkcs8.secret_pkcs8_der()) {
                return Ok(Arc::new(RsaSigningKey::new(key)));
            }
            p256::ecdsa::SigningKey::from_pkcs8_der(pkcs8.secret_pkcs8_der())
                .map(|key| Arc::new(EcdsaSigningKeyP256::new(key)) as Arc<dyn SigningKey>)
                .map_err(|_| Error::General("failed to parse private key as RSA or ECDSA".into()))
        }
        PrivateKeyDer::Pkcs1(pkcs1) => RsaPrivateKey::from_pkcs1_der(pkcs1.secret_pkcs1_der())
            .map(|key| Arc::new(RsaSigningKey::new(key)) as Arc<dyn SigningKey>)
            .map_err(|_| Error::General("failed to parse RSA private key".into())),
        PrivateKeyDer::Sec1(sec1) => p256::SecretKey::from_sec1_der(sec1.secret_sec1_der())
            .map(|key| Arc::new(EcdsaSigningKeyP256::new(key.into())) as Arc<dyn SigningKey>)
            .map_err(|_| Error::General("failed to parse P-256 private key".into())),
        _ => Err(Error::General("unsupported private key format".into())),
    }
}

/// An RSA key signing with PKCS#1 v1.5.
#[derive(Clone, Debug)]
pub(crate) struct RsaSigningKey {
    key: Arc<RsaPrivateKey>,
}

static RSA_SCHEMES: &[SignatureScheme] = &[
    SignatureScheme::RSA_PKCS1_SHA256,
    SignatureScheme::RSA_PKCS1_SHA1,
];

impl RsaSigningKey {
    fn new(key: RsaPrivateKey) -> Self {
        Self { key: Arc::new(key) }
    }
}

impl SigningKey for RsaSigningKey {
    fn choose_scheme(&self, offered: &[SignatureScheme]) -> Option<Box<dyn Signer>> {
        RSA_SCHEMES
            .iter()
            .find(|scheme| offered.contains(scheme))
            .map(|scheme| {
                Box::new(RsaSigner {
                    key: Arc::clone(&self.key),
                    scheme: *scheme,
                    legacy: false,
                }) as Box<dyn Signer>
            })
    }

    fn legacy_signer(&self) -> Option<Box<dyn Signer>> {
        Some(Box::new(RsaSigner {
            key: Arc::clone(&self.key),
            scheme: SignatureScheme::RSA_PKCS1_SHA1,
            legacy: true,
        }))
    }

    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::RSA
    }
}

#[derive(Debug)]
struct RsaSigner {
    key: Arc<RsaPrivateKey>,
    scheme: SignatureScheme,
    legacy: bool,
}

impl Signer for RsaSigner {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, Error> {
        let key = RsaPrivateKey::clone(&self.key);
        let sig = match (self.legacy, self.scheme) {
            (true, _) => {
                let mut digest = Md5::digest(message).to_vec();
                digest.extend_from_slice(&Sha1::digest(message));
                return key
                    .sign(Pkcs1v15Sign::new_unprefixed(), &digest)
                    .map_err(|_| Error::General("signing failed".into()));
            }
            (false, SignatureScheme::RSA_PKCS1_SHA256) => pkcs1v15::SigningKey::<Sha256>::new(key)
                .try_sign(message)
                .map(|sig| sig.to_vec()),
            (false, _) => pkcs1v15::SigningKey::<Sha1>::new(key)
                .try_sign(message)
                .map(|sig| sig.to_vec()),
        };
        sig.map_err(|_| Error::General("signing failed".into()))
    }

    fn scheme(&self) -> SignatureScheme {
        self.scheme
    }
}

/// A P-256 ECDSA key.
#[derive(Clone, Debug)]
pub(crate) struct EcdsaSigningKeyP256 {
    key: Arc<p256::ecdsa::SigningKey>,
}

impl EcdsaSigningKeyP256 {
    fn new(key: p256::ecdsa::SigningKey) -> Self {
        Self { key: Arc::new(key) }
    }

    fn signer(&self, scheme: SignatureScheme) -> Box<dyn Signer> {
        Box::new(EcdsaSigner {
            key: Arc::clone(&self.key),
            scheme,
        })
    }
}

impl SigningKey for EcdsaSigningKeyP256 {
    fn choose_scheme(&self, offered: &[SignatureScheme]) -> Option<Box<dyn Signer>> {
        [
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_SHA1_Legacy,
        ]
        .into_iter()
        .find(|scheme| offered.contains(scheme))
        .map(|scheme| self.signer(scheme))
    }

    fn legacy_signer(&self) -> Option<Box<dyn Signer>> {
        Some(self.signer(SignatureScheme::ECDSA_SHA1_Legacy))
    }

    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::ECDSA
    }
}

#[derive(Debug)]
struct EcdsaSigner {
    key: Arc<p256::ecdsa::SigningKey>,
    scheme: SignatureScheme,
}

impl Signer for EcdsaSigner {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, Error> {
        let sig: Result<p256::ecdsa::Signature, _> = match self.scheme {
            SignatureScheme::ECDSA_SHA1_Legacy => self
                .key
                .sign_prehash(&Sha1::digest(message)),
            _ => self.key.try_sign(message),
        };
        sig.map(|sig| sig.to_der().as_bytes().to_vec())
            .map_err(|_| Error::General("signing failed".into()))
    }

    fn scheme(&self) -> SignatureScheme {
        self.scheme
    }
}
