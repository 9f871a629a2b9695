use std::sync::Arc;

use pki_types::{CertificateDer, ServerName, UnixTime};

use super::anchors::RootCertStore;
use super::verify::{
    verify_legacy_signature, verify_server_cert_signed_by_trust_anchor, verify_server_name,
    verify_tls12_signature, ParsedCertificate, WebPkiSupportedAlgorithms,
};
use crate::crypto::CryptoProvider;
use crate::enums::SignatureScheme;
use crate::error::Error;
#[cfg(feature = "logging")]
use crate::log::trace;
use crate::verify::{
    DigitallySignedStruct, HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};

/// Default `ServerCertVerifier`, see the trait impl for more information.
#[derive(Debug)]
pub struct WebPkiServerVerifier {
    roots: Arc<RootCertStore>,
    supported: WebPkiSupportedAlgorithms,
    request_ocsp: bool,
}

impl WebPkiServerVerifier {
    /// Make a verifier trusting `roots`, checking signatures with the
    /// algorithms `provider` supports.
    pub fn new(roots: impl Into<Arc<RootCertStore>>, provider: &CryptoProvider) -> Self {
        Self::new_with_algorithms(roots, provider.signature_verification_algorithms)
    }

    /// Make a verifier trusting `roots`, checking signatures with `supported`.
    pub(crate) fn new_with_algorithms(
        roots: impl Into<Arc<RootCertStore>>,
        supported: WebPkiSupportedAlgorithms,
    ) -> Self {
        Self {
            roots: roots.into(),
            supported,
            request_ocsp: false,
        }
    }

    /// Ask servers to staple an OCSP response.
    ///
    /// The response is handed to `verify_server_cert` but not checked
    /// by this verifier.
    pub fn with_ocsp_requests(mut self) -> Self {
        self.request_ocsp = true;
        self
    }
}

impl ServerCertVerifier for WebPkiServerVerifier {
    /// Will verify the certificate is valid in the following ways:
    /// - Signed by a trusted `RootCertStore` CA
    /// - Not Expired
    /// - Valid for DNS entry
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, Error> {
        let cert = ParsedCertificate::try_from(end_entity)?;

        verify_server_cert_signed_by_trust_anchor(
            &cert,
            &self.roots,
            intermediates,
            now,
            self.supported.all,
        )?;

        if !ocsp_response.is_empty() {
            trace!("Unvalidated OCSP response: {:?}", ocsp_response.to_vec());
        }

        verify_server_name(&cert, server_name)?;
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error> {
        verify_tls12_signature(message, cert, dss, &self.supported)
    }

    fn verify_legacy_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        signature: &[u8],
    ) -> Result<HandshakeSignatureValid, Error> {
        verify_legacy_signature(message, cert, signature, &self.supported)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.supported.supported_schemes()
    }

    fn request_ocsp_response(&self) -> bool {
        self.request_ocsp
    }
}
