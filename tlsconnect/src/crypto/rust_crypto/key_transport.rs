use pki_types::CertificateDer;
use rsa::{BigUint, Pkcs1v15Encrypt, RsaPublicKey};
use x509_parser::prelude::{FromDer, X509Certificate};
use x509_parser::public_key::PublicKey;

use super::RandAdapter;
use crate::crypto::{self, SecureRandom};
use crate::error::{CertificateError, Error, PeerMisbehaved};

/// RSAES-PKCS1-v1_5 encryption of the pre-master secret.
#[derive(Debug)]
pub struct RsaPkcs1KeyTransport;

impl crypto::KeyTransport for RsaPkcs1KeyTransport {
    fn encrypt_pre_master(
        &self,
        end_entity: &CertificateDer<'_>,
        pre_master: &[u8],
        secure_random: &dyn SecureRandom,
    ) -> Result<Vec<u8>, Error> {
        let public_key = rsa_public_key(end_entity)?;

        let mut rng = RandAdapter::new(secure_random);
        let encrypted = public_key.encrypt(&mut rng, Pkcs1v15Encrypt, pre_master);
        rng.check()?;

        encrypted.map_err(|_| Error::General("RSA encryption failed".into()))
    }
}

fn rsa_public_key(end_entity: &CertificateDer<'_>) -> Result<RsaPublicKey, Error> {
    let (_, cert) = X509Certificate::from_der(end_entity.as_ref())
        .map_err(|_| Error::InvalidCertificate(CertificateError::BadEncoding))?;

    match cert.public_key().parsed() {
        Ok(PublicKey::RSA(key)) => RsaPublicKey::new(
            BigUint::from_bytes_be(key.modulus),
            BigUint::from_bytes_be(key.exponent),
        )
        .map_err(|_| Error::InvalidCertificate(CertificateError::BadEncoding)),
        Ok(_) => Err(PeerMisbehaved::WrongCertificateKeyType.into()),
        Err(_) => Err(Error::InvalidCertificate(CertificateError::BadEncoding)),
    }
}
