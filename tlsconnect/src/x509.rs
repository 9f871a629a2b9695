// Additional x509/asn1 functions to those provided in webpki/ring.

use pki_types::CertificateDer;
use x509_parser::oid_registry::{OID_KEY_TYPE_EC_PUBLIC_KEY, OID_PKCS1_RSAENCRYPTION};
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::enums::SignatureAlgorithm;
use crate::error::{CertificateError, Error};

/// The type of key in the subjectPublicKeyInfo of `cert`.
///
/// Anything other than RSA or EC keys comes back as
/// `SignatureAlgorithm::Unknown`, which no cipher suite accepts.
pub(crate) fn public_key_algorithm(cert: &CertificateDer<'_>) -> Result<SignatureAlgorithm, Error> {
    let (_, parsed) = X509Certificate::from_der(cert.as_ref())
        .map_err(|_| Error::InvalidCertificate(CertificateError::BadEncoding))?;

    let oid = &parsed
        .public_key()
        .algorithm
        .algorithm;
    Ok(if *oid == OID_PKCS1_RSAENCRYPTION {
        SignatureAlgorithm::RSA
    } else if *oid == OID_KEY_TYPE_EC_PUBLIC_KEY {
        SignatureAlgorithm::ECDSA
    } else {
        SignatureAlgorithm::Unknown(0xff)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_bad_encoding() {
        let cert = CertificateDer::from(vec![0x30, 0x03, 0x02, 0x01, 0x00]);
        assert_eq!(
            public_key_algorithm(&cert),
            Err(Error::InvalidCertificate(CertificateError::BadEncoding))
        );
    }
}
