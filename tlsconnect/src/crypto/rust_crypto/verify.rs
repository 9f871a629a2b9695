use der::Reader;
use md5::Md5;
use p256::ecdsa::signature::hazmat::PrehashVerifier;
use pki_types::{alg_id, AlgorithmIdentifier, InvalidSignature, SignatureVerificationAlgorithm};
use rsa::signature::Verifier;
use rsa::{pkcs1v15, BigUint, Pkcs1v15Sign, RsaPublicKey};
use sha1::{Digest, Sha1};
use sha2::{Sha256, Sha384};

use crate::crypto::WebPkiSupportedAlgorithms;
use crate::enums::{SignatureAlgorithm, SignatureScheme};

/// The signature algorithms this provider verifies.
pub static SUPPORTED_SIG_ALGS: WebPkiSupportedAlgorithms = WebPkiSupportedAlgorithms {
    all: &[
        RSA_PKCS1_SHA256,
        RSA_PKCS1_SHA384,
        ECDSA_P256_SHA256,
        RSA_PKCS1_SHA1,
    ],
    mapping: &[
        (SignatureScheme::ECDSA_NISTP256_SHA256, &[ECDSA_P256_SHA256]),
        (SignatureScheme::RSA_PKCS1_SHA256, &[RSA_PKCS1_SHA256]),
        (SignatureScheme::RSA_PKCS1_SHA384, &[RSA_PKCS1_SHA384]),
        (SignatureScheme::ECDSA_SHA1_Legacy, &[ECDSA_P256_SHA1]),
        (SignatureScheme::RSA_PKCS1_SHA1, &[RSA_PKCS1_SHA1]),
    ],
    legacy: &[
        (SignatureAlgorithm::RSA, RSA_PKCS1_MD5_SHA1),
        (SignatureAlgorithm::ECDSA, ECDSA_P256_SHA1),
    ],
};

static RSA_PKCS1_SHA256: &dyn SignatureVerificationAlgorithm = &RsaPkcs1Verify::<Sha256> {
    signature_alg_id: alg_id::RSA_PKCS1_SHA256,
    digest: std::marker::PhantomData,
};
static RSA_PKCS1_SHA384: &dyn SignatureVerificationAlgorithm = &RsaPkcs1Verify::<Sha384> {
    signature_alg_id: alg_id::RSA_PKCS1_SHA384,
    digest: std::marker::PhantomData,
};
static RSA_PKCS1_SHA1: &dyn SignatureVerificationAlgorithm = &RsaPkcs1Verify::<Sha1> {
    signature_alg_id: RSA_PKCS1_SHA1_ALG_ID,
    digest: std::marker::PhantomData,
};
static RSA_PKCS1_MD5_SHA1: &dyn SignatureVerificationAlgorithm = &RsaPkcs1Md5Sha1Verify;
static ECDSA_P256_SHA256: &dyn SignatureVerificationAlgorithm = &EcdsaP256Sha256Verify;
static ECDSA_P256_SHA1: &dyn SignatureVerificationAlgorithm = &EcdsaP256Sha1Verify;

/// sha1WithRSAEncryption, with NULL parameters.
const RSA_PKCS1_SHA1_ALG_ID: AlgorithmIdentifier = AlgorithmIdentifier::from_slice(&[
    0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x05, 0x05, 0x00,
]);

/// ecdsa-with-SHA1.
const ECDSA_SHA1_ALG_ID: AlgorithmIdentifier =
    AlgorithmIdentifier::from_slice(&[0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x04, 0x01]);

struct RsaPkcs1Verify<D> {
    signature_alg_id: AlgorithmIdentifier,
    digest: std::marker::PhantomData<fn() -> D>,
}

impl<D> std::fmt::Debug for RsaPkcs1Verify<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaPkcs1Verify")
            .field("signature_alg_id", &self.signature_alg_id)
            .finish()
    }
}

impl<D> SignatureVerificationAlgorithm for RsaPkcs1Verify<D>
where
    D: Digest + pkcs8::AssociatedOid + Send + Sync + 'static,
{
    fn public_key_alg_id(&self) -> AlgorithmIdentifier {
        alg_id::RSA_ENCRYPTION
    }

    fn signature_alg_id(&self) -> AlgorithmIdentifier {
        self.signature_alg_id
    }

    fn verify_signature(
        &self,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), InvalidSignature> {
        let public_key = decode_spki_spk(public_key)?;

        let signature = pkcs1v15::Signature::try_from(signature).map_err(|_| InvalidSignature)?;

        pkcs1v15::VerifyingKey::<D>::new(public_key)
            .verify(message, &signature)
            .map_err(|_| InvalidSignature)
    }
}

/// PKCS#1 v1.5 over `MD5 || SHA1` without a `DigestInfo`, as signed by
/// servers before TLS 1.2.
#[derive(Debug)]
struct RsaPkcs1Md5Sha1Verify;

impl SignatureVerificationAlgorithm for RsaPkcs1Md5Sha1Verify {
    fn public_key_alg_id(&self) -> AlgorithmIdentifier {
        alg_id::RSA_ENCRYPTION
    }

    fn signature_alg_id(&self) -> AlgorithmIdentifier {
        RSA_PKCS1_SHA1_ALG_ID
    }

    fn verify_signature(
        &self,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), InvalidSignature> {
        let public_key = decode_spki_spk(public_key)?;

        let mut hashed = Md5::digest(message).to_vec();
        hashed.extend_from_slice(&Sha1::digest(message));

        public_key
            .verify(Pkcs1v15Sign::new_unprefixed(), &hashed, signature)
            .map_err(|_| InvalidSignature)
    }
}

#[derive(Debug)]
struct EcdsaP256Sha256Verify;

impl SignatureVerificationAlgorithm for EcdsaP256Sha256Verify {
    fn public_key_alg_id(&self) -> AlgorithmIdentifier {
        alg_id::ECDSA_P256
    }

    fn signature_alg_id(&self) -> AlgorithmIdentifier {
        alg_id::ECDSA_SHA256
    }

    fn verify_signature(
        &self,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), InvalidSignature> {
        let (key, signature) = decode_ecdsa(public_key, signature)?;
        key.verify(message, &signature)
            .map_err(|_| InvalidSignature)
    }
}

#[derive(Debug)]
struct EcdsaP256Sha1Verify;

impl SignatureVerificationAlgorithm for EcdsaP256Sha1Verify {
    fn public_key_alg_id(&self) -> AlgorithmIdentifier {
        alg_id::ECDSA_P256
    }

    fn signature_alg_id(&self) -> AlgorithmIdentifier {
        ECDSA_SHA1_ALG_ID
    }

    fn verify_signature(
        &self,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), InvalidSignature> {
        let (key, signature) = decode_ecdsa(public_key, signature)?;
        key.verify_prehash(&Sha1::digest(message), &signature)
            .map_err(|_| InvalidSignature)
    }
}

fn decode_ecdsa(
    public_key: &[u8],
    signature: &[u8],
) -> Result<(p256::ecdsa::VerifyingKey, p256::ecdsa::Signature), InvalidSignature> {
    let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(public_key).map_err(|_| InvalidSignature)?;
    let signature = p256::ecdsa::Signature::from_der(signature).map_err(|_| InvalidSignature)?;
    Ok((key, signature))
}

fn decode_spki_spk(spki_spk: &[u8]) -> Result<RsaPublicKey, InvalidSignature> {
    // public_key: unfortunately this is not a whole SPKI, but just the key material.
    // decode the two integers manually.
    let mut reader = der::SliceReader::new(spki_spk).map_err(|_| InvalidSignature)?;
    let ne: [der::asn1::UintRef<'_>; 2] = reader
        .decode()
        .map_err(|_| InvalidSignature)?;

    RsaPublicKey::new(
        BigUint::from_bytes_be(ne[0].as_bytes()),
        BigUint::from_bytes_be(ne[1].as_bytes()),
    )
    .map_err(|_| InvalidSignature)
}
