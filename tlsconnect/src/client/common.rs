use std::sync::Arc;

use pki_types::CertificateDer;

use super::ResolvesClientCert;
use crate::crypto::signer::{CertifiedKey, Signer};
use crate::enums::SignatureAlgorithm;
#[cfg(feature = "logging")]
use crate::log::{debug, trace};
use crate::msgs::enums::{ClientCertificateType, ExtensionType};
use crate::msgs::handshake::{CertificateRequestPayload, ServerExtension};

#[derive(Debug)]
pub(super) struct ServerCertDetails {
    pub(super) cert_chain: Vec<CertificateDer<'static>>,
    pub(super) ocsp_response: Vec<u8>,
}

impl ServerCertDetails {
    pub(super) fn new(cert_chain: Vec<CertificateDer<'static>>) -> Self {
        Self {
            cert_chain,
            ocsp_response: Vec::new(),
        }
    }

    pub(super) fn end_entity(&self) -> Option<&CertificateDer<'static>> {
        self.cert_chain.first()
    }
}

pub(super) struct ClientHelloDetails {
    pub(super) sent_extensions: Vec<ExtensionType>,
}

impl ClientHelloDetails {
    pub(super) fn new() -> Self {
        Self {
            sent_extensions: Vec::new(),
        }
    }

    pub(super) fn server_sent_unsolicited_extensions(
        &self,
        received_exts: &[ServerExtension],
        allowed_unsolicited: &[ExtensionType],
    ) -> bool {
        for ext in received_exts {
            let ext_type = ext.ext_type();
            if !self.sent_extensions.contains(&ext_type) && !allowed_unsolicited.contains(&ext_type)
            {
                trace!("Unsolicited extension {:?}", ext_type);
                return true;
            }
        }

        false
    }
}

pub(super) enum ClientAuthDetails {
    /// Send an empty `Certificate` and no `CertificateVerify`.
    Empty,
    /// Send a non-empty `Certificate` and a `CertificateVerify`.
    Verify {
        certkey: Arc<CertifiedKey>,
        signer: Box<dyn Signer>,
    },
}

impl ClientAuthDetails {
    /// Ask `resolver` for a certificate matching `req`.
    ///
    /// The key must be of a type the server listed; at TLS 1.2 it must also
    /// support one of the server's signature schemes.  Below TLS 1.2 the
    /// request carries no schemes and the key type fixes the signature.
    pub(super) fn resolve(resolver: &dyn ResolvesClientCert, req: &CertificateRequestPayload) -> Self {
        let acceptable_issuers = req
            .canames
            .iter()
            .map(|name| name.as_ref())
            .collect::<Vec<&[u8]>>();
        let sigschemes = req.sigschemes.as_deref().unwrap_or(&[]);

        if let Some(certkey) = resolver.resolve(&acceptable_issuers, sigschemes) {
            let certtype = match certkey.key.algorithm() {
                SignatureAlgorithm::RSA => Some(ClientCertificateType::RSASign),
                SignatureAlgorithm::ECDSA => Some(ClientCertificateType::ECDSASign),
                _ => None,
            };

            let signer = match (certtype, &req.sigschemes) {
                (Some(certtype), _) if !req.certtypes.contains(&certtype) => None,
                (None, _) => None,
                (Some(_), Some(sigschemes)) => certkey.key.choose_scheme(sigschemes),
                (Some(_), None) => certkey.key.legacy_signer(),
            };

            if let Some(signer) = signer {
                debug!("Attempting client auth");
                return Self::Verify { certkey, signer };
            }
        }

        debug!("Client auth requested but no cert/sigscheme available");
        Self::Empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::SignatureScheme;
    use crate::error::Error;
    use crate::msgs::handshake::DistinguishedName;
    use crate::crypto::signer::SigningKey;

    #[derive(Debug)]
    struct FakeSigner(SignatureScheme);

    impl Signer for FakeSigner {
        fn sign(&self, _message: &[u8]) -> Result<Vec<u8>, Error> {
            Ok(vec![1, 2, 3])
        }

        fn scheme(&self) -> SignatureScheme {
            self.0
        }
    }

    #[derive(Debug)]
    struct FakeKey(SignatureAlgorithm);

    impl SigningKey for FakeKey {
        fn choose_scheme(&self, offered: &[SignatureScheme]) -> Option<Box<dyn Signer>> {
            offered
                .iter()
                .find(|scheme| scheme.sign() == self.0)
                .map(|scheme| Box::new(FakeSigner(*scheme)) as Box<dyn Signer>)
        }

        fn legacy_signer(&self) -> Option<Box<dyn Signer>> {
            Some(Box::new(FakeSigner(SignatureScheme::RSA_PKCS1_SHA1)))
        }

        fn algorithm(&self) -> SignatureAlgorithm {
            self.0
        }
    }

    #[derive(Debug)]
    struct Fixed(Arc<CertifiedKey>);

    impl ResolvesClientCert for Fixed {
        fn resolve(
            &self,
            _acceptable_issuers: &[&[u8]],
            _sigschemes: &[SignatureScheme],
        ) -> Option<Arc<CertifiedKey>> {
            Some(self.0.clone())
        }

        fn has_certs(&self) -> bool {
            true
        }
    }

    fn resolver(alg: SignatureAlgorithm) -> Fixed {
        Fixed(Arc::new(CertifiedKey::new(
            vec![CertificateDer::from(vec![0x30])],
            Arc::new(FakeKey(alg)),
        )))
    }

    fn request(
        certtypes: Vec<ClientCertificateType>,
        sigschemes: Option<Vec<SignatureScheme>>,
    ) -> CertificateRequestPayload {
        CertificateRequestPayload {
            certtypes,
            sigschemes,
            canames: vec![DistinguishedName::from(vec![0x30, 0x00])],
        }
    }

    #[test]
    fn matching_key_and_scheme() {
        let req = request(
            vec![ClientCertificateType::RSASign],
            Some(vec![SignatureScheme::RSA_PKCS1_SHA256]),
        );
        match ClientAuthDetails::resolve(&resolver(SignatureAlgorithm::RSA), &req) {
            ClientAuthDetails::Verify { signer, .. } => {
                assert_eq!(signer.scheme(), SignatureScheme::RSA_PKCS1_SHA256)
            }
            ClientAuthDetails::Empty => panic!("expected a certificate"),
        }
    }

    #[test]
    fn wrong_certificate_type_sends_empty() {
        let req = request(
            vec![ClientCertificateType::ECDSASign],
            Some(vec![SignatureScheme::RSA_PKCS1_SHA256]),
        );
        assert!(matches!(
            ClientAuthDetails::resolve(&resolver(SignatureAlgorithm::RSA), &req),
            ClientAuthDetails::Empty
        ));
    }

    #[test]
    fn no_common_scheme_sends_empty() {
        let req = request(
            vec![ClientCertificateType::ECDSASign],
            Some(vec![SignatureScheme::RSA_PKCS1_SHA256]),
        );
        assert!(matches!(
            ClientAuthDetails::resolve(&resolver(SignatureAlgorithm::ECDSA), &req),
            ClientAuthDetails::Empty
        ));
    }

    #[test]
    fn legacy_request_uses_legacy_signer() {
        let req = request(vec![ClientCertificateType::RSASign], None);
        match ClientAuthDetails::resolve(&resolver(SignatureAlgorithm::RSA), &req) {
            ClientAuthDetails::Verify { signer, .. } => {
                assert_eq!(signer.scheme(), SignatureScheme::RSA_PKCS1_SHA1)
            }
            ClientAuthDetails::Empty => panic!("expected a certificate"),
        }
    }
}
