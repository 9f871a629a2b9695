//! Key exchange strategies.
//!
//! One [`KeyExchangeStrategy`] is chosen from the negotiated cipher suite
//! once the ServerHello has been processed, and it owns every piece of
//! ephemeral key material for the rest of the handshake.  Dropping the
//! strategy zeroes that material, whichever state the handshake reached.

use pki_types::CertificateDer;
use zeroize::Zeroizing;

use crate::client::ClientConfig;
use crate::crypto::SecureRandom;
use crate::enums::ProtocolVersion;
use crate::error::{Error, InvalidMessage, PeerIncompatible, PeerMisbehaved};
#[cfg(feature = "logging")]
use crate::log::trace;
use crate::msgs::base::PayloadU16;
use crate::msgs::codec::{Codec, Reader};
use crate::msgs::handshake::KeyExchangeAlgorithm;
use crate::suites::SupportedCipherSuite;
use crate::verify::{DigitallySignedStruct, HandshakeSignatureValid, ServerCertVerifier};
use crate::x509;

mod dh;
mod ecdh;
mod psk;
mod rsa;
mod srp;

pub use psk::{PskIdentity, ResolvesPskIdentity, StaticPskIdentity};
pub use srp::SrpCredentials;

/// Whether a cipher suite's key exchange sends a ServerKeyExchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ServerKeyExchangeUse {
    /// The server must not send one (RSA key transport).
    Forbidden,
    /// The server may omit it (plain PSK without an identity hint).
    Optional,
    /// The server must send one.
    Required,
}

/// What a strategy needs to build the ClientKeyExchange.
pub(crate) struct ClientKxContext<'a> {
    /// The version offered in our ClientHello.
    pub(crate) client_version: ProtocolVersion,
    /// The server's end-entity certificate, if the suite has one.
    pub(crate) server_cert: Option<&'a CertificateDer<'a>>,
    pub(crate) secure_random: &'static dyn SecureRandom,
}

/// Everything signed by the server in a ServerKeyExchange.
pub(crate) struct ServerKxParams {
    /// The algorithm-specific parameters, exactly as sent.
    pub(crate) params: Vec<u8>,
    pub(crate) signature: Option<ServerKxSignature>,
}

/// The signature trailing a ServerKeyExchange.
pub(crate) enum ServerKxSignature {
    /// TLS 1.2: the scheme is named in the message.
    Tls12(DigitallySignedStruct),
    /// TLS 1.0 and 1.1: fixed by the certificate key type.
    Legacy(PayloadU16),
}

/// The key-exchange-specific steps of the handshake.
pub(crate) trait KeyExchangeStrategy: Send + Sync {
    /// The key exchange this strategy implements.
    fn algorithm(&self) -> KeyExchangeAlgorithm;

    /// Whether the server sends us a ServerKeyExchange.
    fn server_key_exchange(&self) -> ServerKeyExchangeUse {
        ServerKeyExchangeUse::Required
    }

    /// Decode the algorithm-specific parameters at the front of a
    /// ServerKeyExchange body, retaining whatever is needed later.
    fn parse_server_params(&mut self, r: &mut Reader<'_>) -> Result<(), Error>;

    /// Check the server's signature over
    /// `client_random || server_random || params`.
    fn verify_params_signature(
        &self,
        verifier: &dyn ServerCertVerifier,
        server_cert: &CertificateDer<'_>,
        randoms: &[u8; 64],
        server_kx: &ServerKxParams,
        suite: SupportedCipherSuite,
    ) -> Result<HandshakeSignatureValid, Error> {
        let Some(signature) = &server_kx.signature else {
            return Err(PeerMisbehaved::SignedKxWithWrongAlgorithm.into());
        };

        let mut message = Vec::with_capacity(randoms.len() + server_kx.params.len());
        message.extend_from_slice(randoms);
        message.extend_from_slice(&server_kx.params);

        let key_type = x509::public_key_algorithm(server_cert)?;
        match signature {
            ServerKxSignature::Tls12(dss) => {
                if !verifier
                    .supported_verify_schemes()
                    .contains(&dss.scheme)
                {
                    return Err(PeerMisbehaved::SignedHandshakeWithUnadvertisedSigScheme.into());
                }
                if dss.scheme.sign() != key_type || !suite.usable_for_signature_algorithm(key_type)
                {
                    return Err(PeerMisbehaved::SignedKxWithWrongAlgorithm.into());
                }
                trace!("ServerKeyExchange signed with {:?}", dss.scheme);
                verifier.verify_tls12_signature(&message, server_cert, dss)
            }
            ServerKxSignature::Legacy(sig) => {
                if !suite.usable_for_signature_algorithm(key_type) {
                    return Err(PeerMisbehaved::SignedKxWithWrongAlgorithm.into());
                }
                verifier.verify_legacy_signature(&message, server_cert, &sig.0)
            }
        }
    }

    /// Produce the body of our ClientKeyExchange, computing (and keeping)
    /// the pre-master secret as a side effect.
    fn compute_client_key_exchange_message(
        &mut self,
        cx: &ClientKxContext<'_>,
    ) -> Result<Vec<u8>, Error>;

    /// Hand over the pre-master secret computed by
    /// `compute_client_key_exchange_message`.  It is only available once.
    fn derive_pre_master_secret(&mut self) -> Result<Zeroizing<Vec<u8>>, Error>;
}

/// Pick the strategy for `suite`.
pub(crate) fn for_suite(
    suite: SupportedCipherSuite,
    config: &ClientConfig,
) -> Result<Box<dyn KeyExchangeStrategy>, Error> {
    let provider = &config.provider;
    Ok(match suite.kx {
        KeyExchangeAlgorithm::RSA => Box::new(rsa::RsaKeyTransport::new(provider.key_transport)),
        KeyExchangeAlgorithm::DHE | KeyExchangeAlgorithm::DH_anon => Box::new(
            dh::FiniteFieldDh::new(suite.kx, provider.finite_field),
        ),
        KeyExchangeAlgorithm::ECDHE => Box::new(ecdh::EphemeralEcdh::new(
            suite.kx,
            provider.kx_groups.clone(),
        )),
        KeyExchangeAlgorithm::PSK
        | KeyExchangeAlgorithm::DHE_PSK
        | KeyExchangeAlgorithm::ECDHE_PSK => {
            let resolver = config
                .psk
                .clone()
                .ok_or(PeerIncompatible::NoPskIdentityAvailable)?;
            let inner: Option<Box<dyn KeyExchangeStrategy>> = match suite.kx {
                KeyExchangeAlgorithm::DHE_PSK => Some(Box::new(dh::FiniteFieldDh::new(
                    suite.kx,
                    provider.finite_field,
                ))),
                KeyExchangeAlgorithm::ECDHE_PSK => Some(Box::new(ecdh::EphemeralEcdh::new(
                    suite.kx,
                    provider.kx_groups.clone(),
                ))),
                _ => None,
            };
            Box::new(psk::PreSharedKey::new(suite.kx, resolver, inner))
        }
        KeyExchangeAlgorithm::SRP => {
            let credentials = config
                .srp
                .clone()
                .ok_or(PeerIncompatible::NoSrpCredentialsAvailable)?;
            Box::new(srp::SecureRemotePassword::new(provider.srp, credentials))
        }
    })
}

/// Split a ServerKeyExchange body into parameters and signature, letting
/// `strategy` parse and keep the parameters.
pub(crate) fn decode_server_key_exchange(
    strategy: &mut dyn KeyExchangeStrategy,
    body: &[u8],
    signed: bool,
    version: ProtocolVersion,
) -> Result<ServerKxParams, Error> {
    let mut r = Reader::init(body);
    strategy.parse_server_params(&mut r)?;
    let params = body[..r.used()].to_vec();

    let signature = match (signed, version) {
        (false, _) => None,
        (true, ProtocolVersion::TLSv1_2) => {
            Some(ServerKxSignature::Tls12(DigitallySignedStruct::read(&mut r)?))
        }
        (true, _) => Some(ServerKxSignature::Legacy(PayloadU16::read(&mut r)?)),
    };
    r.expect_empty("ServerKeyExchangePayload")?;

    Ok(ServerKxParams { params, signature })
}

/// Take the secret a strategy computed, or fail if it never did.
fn take_secret(secret: &mut Option<Zeroizing<Vec<u8>>>) -> Result<Zeroizing<Vec<u8>>, Error> {
    secret
        .take()
        .ok_or_else(|| Error::General("pre-master secret requested before key exchange".into()))
}

/// The number of significant bits in the big-endian integer `v`.
fn bit_length(v: &[u8]) -> usize {
    match v.iter().position(|&b| b != 0) {
        Some(first) => (v.len() - first - 1) * 8 + (8 - v[first].leading_zeros() as usize),
        None => 0,
    }
}

/// Strategies that require parameters reject their absence.
fn missing_params(what: &'static str) -> Error {
    InvalidMessage::MissingData(what).into()
}
