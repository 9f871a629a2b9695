use std::fmt::Debug;

use pki_types::{CertificateDer, ServerName, UnixTime};

use crate::enums::SignatureScheme;
use crate::error::{Error, InvalidMessage};
use crate::msgs::base::PayloadU16;
use crate::msgs::codec::{Codec, Reader};

// Marker types.  These are used to bind the fact some verification
// (certificate chain or handshake signature) has taken place into
// protocol states.  We use this to have the compiler check that there
// are no 'goto fail'-style elisions of important checks before we
// reach the traffic stage.
//
// These types are public, but cannot be directly constructed.  This
// means their origins can be precisely determined by looking
// for their `assertion` constructors.

/// Zero-sized marker type representing verification of a signature.
#[derive(Debug)]
pub struct HandshakeSignatureValid(());

impl HandshakeSignatureValid {
    /// Make a `HandshakeSignatureValid`
    pub fn assertion() -> Self {
        Self(())
    }
}

#[derive(Debug)]
pub(crate) struct FinishedMessageVerified(());

impl FinishedMessageVerified {
    pub(crate) fn assertion() -> Self {
        Self(())
    }
}

/// Zero-sized marker type representing verification of a server cert chain.
#[derive(Debug)]
pub struct ServerCertVerified(());

impl ServerCertVerified {
    /// Make a `ServerCertVerified`
    pub fn assertion() -> Self {
        Self(())
    }
}

/// Something that can verify a server certificate chain, and verify
/// signatures made by certificates.
pub trait ServerCertVerifier: Debug + Send + Sync {
    /// Verify the end-entity certificate `end_entity` is valid for the
    /// hostname `server_name` and chains to at least one trust anchor.
    ///
    /// `intermediates` contains all certificates other than `end_entity` that
    /// were sent as part of the server's Certificate message. It is in the
    /// same order that the server sent them and may be empty.
    ///
    /// `ocsp_response` is empty if no OCSP response was received, and that also
    /// covers the case where `request_ocsp_response()` returns false.
    ///
    /// Note that none of the certificates have been parsed yet, so it is the
    /// responsibility of the implementer to handle invalid data. It is recommended
    /// that the implementer returns
    /// [`Error::InvalidCertificate(CertificateError::BadEncoding)`] when these
    /// cases are encountered.
    ///
    /// [`Error::InvalidCertificate(CertificateError::BadEncoding)`]: crate::CertificateError::BadEncoding
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, Error>;

    /// Verify a TLS 1.2 signature allegedly by the given server certificate.
    ///
    /// `message` is not hashed, and needs hashing during the verification.
    /// The signature and algorithm are within `dss`.  `cert` contains the
    /// public key to use.
    ///
    /// If and only if the signature is valid, return `Ok(HandshakeSignatureValid)`.
    /// Otherwise, return an error; tlsconnect will send an alert and abort the
    /// connection.
    ///
    /// Note that, in TLS1.2, SignatureSchemes such as
    /// `SignatureScheme::ECDSA_NISTP256_SHA256` are not in fact bound to the
    /// specific curve implied in their name.
    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error>;

    /// Verify a TLS 1.0 or 1.1 signature allegedly by the given server
    /// certificate.
    ///
    /// These versions carry no algorithm identifier: the construction is
    /// fixed by the certificate key type.  RSA keys sign `MD5 || SHA1` of
    /// `message` with PKCS#1 v1.5 padding and no `DigestInfo`; ECDSA keys
    /// sign the SHA-1 of `message`.
    fn verify_legacy_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        signature: &[u8],
    ) -> Result<HandshakeSignatureValid, Error>;

    /// Return the list of SignatureSchemes that this verifier will handle,
    /// in `verify_tls12_signature` calls.
    ///
    /// This should be in priority order, with the most preferred first.
    fn supported_verify_schemes(&self) -> Vec<SignatureScheme>;

    /// Returns `true` if this verifier wants a stapled OCSP response.
    fn request_ocsp_response(&self) -> bool {
        false
    }
}

/// What happens when the server certificate chain is rejected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VerifyMode {
    /// Send a fatal alert and abort the handshake.
    #[default]
    Strict,
    /// Log the failure, record it in the session's verify result, and
    /// carry on.  Handshake signatures are still checked against the
    /// presented certificate.
    Permissive,
}

/// This type combines a [`SignatureScheme`] and a signature payload produced with that scheme.
#[derive(Debug, Clone)]
pub struct DigitallySignedStruct {
    /// The [`SignatureScheme`] used to produce the signature.
    pub scheme: SignatureScheme,
    sig: PayloadU16,
}

impl DigitallySignedStruct {
    pub(crate) fn new(scheme: SignatureScheme, sig: Vec<u8>) -> Self {
        Self {
            scheme,
            sig: PayloadU16::new(sig),
        }
    }

    /// Get the signature.
    pub fn signature(&self) -> &[u8] {
        &self.sig.0
    }
}

impl Codec<'_> for DigitallySignedStruct {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.scheme.encode(bytes);
        self.sig.encode(bytes);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let scheme = SignatureScheme::read(r)?;
        let sig = PayloadU16::read(r)?;

        Ok(Self { scheme, sig })
    }
}

#[test]
fn assertions_are_debug() {
    assert_eq!(
        format!("{:?}", HandshakeSignatureValid::assertion()),
        "HandshakeSignatureValid(())"
    );
    assert_eq!(
        format!("{:?}", FinishedMessageVerified::assertion()),
        "FinishedMessageVerified(())"
    );
    assert_eq!(
        format!("{:?}", ServerCertVerified::assertion()),
        "ServerCertVerified(())"
    );
}

#[test]
fn digitally_signed_struct_layout() {
    let dss = DigitallySignedStruct::new(SignatureScheme::RSA_PKCS1_SHA256, vec![0xaa, 0xbb]);
    assert_eq!(dss.get_encoding(), [0x04, 0x01, 0x00, 0x02, 0xaa, 0xbb]);

    let back = DigitallySignedStruct::read_bytes(&[0x02, 0x01, 0x00, 0x01, 0xcc]).unwrap();
    assert_eq!(back.scheme, SignatureScheme::RSA_PKCS1_SHA1);
    assert_eq!(back.signature(), &[0xcc]);
}
