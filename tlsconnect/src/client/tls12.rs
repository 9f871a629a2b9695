use std::sync::Arc;

use pki_types::ServerName;
use subtle::ConstantTimeEq;

use super::client_conn::ClientConfig;
use super::common::{ClientAuthDetails, ServerCertDetails};
use super::state::{ClientContext, HandshakeState, State, Transition};
use crate::enums::{ContentType, HandshakeType, ProtocolVersion};
use crate::error::{Error, InvalidMessage, PeerMisbehaved};
use crate::hash_hs::HandshakeHash;
use crate::kx::{self, ClientKxContext, KeyExchangeStrategy, ServerKeyExchangeUse};
#[cfg(feature = "logging")]
use crate::log::{debug, trace, warn};
use crate::msgs::base::{Payload, PayloadU16};
use crate::msgs::ccs::ChangeCipherSpecPayload;
use crate::msgs::handshake::{
    CertificatePayload, HandshakeMessagePayload, HandshakePayload, KeyExchangeAlgorithm,
    SessionId,
};
use crate::msgs::message::{Message, MessagePayload};
use crate::session::{Session, VerifyResult};
use crate::suites::SupportedCipherSuite;
use crate::tls12::{ConnectionRandoms, ConnectionSecrets};
use crate::verify::{DigitallySignedStruct, FinishedMessageVerified, VerifyMode};
use crate::{check, x509};

/// Handshake details fixed once the ServerHello is accepted.
pub(super) struct HandshakeDetails {
    pub(super) config: Arc<ClientConfig>,
    pub(super) server_name: ServerName<'static>,
    pub(super) suite: SupportedCipherSuite,
    pub(super) version: ProtocolVersion,
    /// The version we offered, which RSA key transport embeds in the
    /// pre-master secret.
    pub(super) client_version: ProtocolVersion,
    pub(super) randoms: ConnectionRandoms,
    /// The session id the server assigned, possibly empty.
    pub(super) session_id: SessionId,
    pub(super) ticket_expected: bool,
    pub(super) status_expected: bool,
}

/// The first state of a full handshake.
pub(super) fn after_server_hello(
    hs: HandshakeDetails,
    transcript: HandshakeHash,
    strategy: Box<dyn KeyExchangeStrategy>,
) -> Transition {
    if hs.suite.requires_server_cert() {
        Transition::Next(Box::new(ExpectCertificate {
            hs,
            transcript,
            strategy,
        }))
    } else {
        Transition::Next(Box::new(ExpectServerKx {
            hs,
            transcript,
            strategy,
            server_cert: None,
        }))
    }
}

/// The first state of an abbreviated handshake: the server goes straight
/// to its ChangeCipherSpec, perhaps with a fresh ticket first.
pub(super) fn after_resumption(
    hs: HandshakeDetails,
    mut transcript: HandshakeHash,
    secrets: ConnectionSecrets,
    resuming: Session,
) -> Transition {
    transcript.abandon_client_auth();
    if hs.ticket_expected {
        Transition::Next(Box::new(ExpectNewTicket {
            hs,
            transcript,
            secrets,
            resuming: Some(resuming),
        }))
    } else {
        Transition::Next(Box::new(ExpectCcs {
            hs,
            transcript,
            secrets,
            resuming: Some(resuming),
            new_ticket: None,
        }))
    }
}

pub(super) fn log_master_secret(config: &ClientConfig, secrets: &ConnectionSecrets) {
    const LABEL: &str = "CLIENT_RANDOM";
    if config.key_log.will_log(LABEL) {
        config
            .key_log
            .log(LABEL, &secrets.randoms.client, secrets.master_secret());
    }
}

/// Where a full handshake goes once the server certificate (and any
/// status) is dealt with.
fn after_certificate(
    hs: HandshakeDetails,
    transcript: HandshakeHash,
    strategy: Box<dyn KeyExchangeStrategy>,
    server_cert: ServerCertDetails,
) -> Box<dyn State> {
    match strategy.server_key_exchange() {
        ServerKeyExchangeUse::Forbidden => Box::new(ExpectServerDoneOrCertReq {
            hs,
            transcript,
            strategy,
            server_cert: Some(server_cert),
        }),
        _ => Box::new(ExpectServerKx {
            hs,
            transcript,
            strategy,
            server_cert: Some(server_cert),
        }),
    }
}

/// Check the server's chain, honouring the configured [`VerifyMode`].
fn verify_server_cert(
    hs: &HandshakeDetails,
    cx: &mut ClientContext<'_>,
    server_cert: &ServerCertDetails,
) -> Result<(), Error> {
    let (end_entity, intermediates) = server_cert
        .cert_chain
        .split_first()
        .ok_or(Error::NoCertificatesPresented)?;

    let now = hs.config.current_time()?;
    let result = hs.config.verifier.verify_server_cert(
        end_entity,
        intermediates,
        &hs.server_name,
        &server_cert.ocsp_response,
        now,
    );

    cx.data.verify_result = Some(match (result, hs.config.verify_mode) {
        (Ok(_verified), _) => VerifyResult::Verified,
        (Err(err), VerifyMode::Strict) => return Err(err),
        (Err(err), VerifyMode::Permissive) => {
            warn!("Server certificate did not verify: {}; continuing", err);
            VerifyResult::Failed(err)
        }
    });
    cx.data.peer_certificates = Some(server_cert.cert_chain.clone());
    Ok(())
}

struct ExpectCertificate {
    hs: HandshakeDetails,
    transcript: HandshakeHash,
    strategy: Box<dyn KeyExchangeStrategy>,
}

impl State for ExpectCertificate {
    fn handle(
        mut self: Box<Self>,
        cx: &mut ClientContext<'_>,
        m: Message,
    ) -> Result<Transition, Error> {
        check::check_message(&m, &[ContentType::Handshake], &[HandshakeType::Certificate])?;
        cx.common
            .hash_message(&mut self.transcript, &m);
        let CertificatePayload(cert_chain) =
            require_handshake_msg_move!(m, HandshakeType::Certificate, HandshakePayload::Certificate)?;

        let server_cert = ServerCertDetails::new(cert_chain);
        let end_entity = server_cert
            .end_entity()
            .ok_or(Error::NoCertificatesPresented)?;

        let key_type = x509::public_key_algorithm(end_entity)?;
        if !self
            .hs
            .suite
            .usable_for_signature_algorithm(key_type)
        {
            return Err(PeerMisbehaved::WrongCertificateKeyType.into());
        }

        if self.hs.status_expected {
            return Ok(Transition::Next(Box::new(ExpectCertificateStatus {
                hs: self.hs,
                transcript: self.transcript,
                strategy: self.strategy,
                server_cert,
            })));
        }

        verify_server_cert(&self.hs, cx, &server_cert)?;
        Ok(Transition::Next(after_certificate(
            self.hs,
            self.transcript,
            self.strategy,
            server_cert,
        )))
    }

    fn handshake_state(&self) -> HandshakeState {
        HandshakeState::RecvCertificate
    }
}

/// The server acknowledged our status request, but may still leave out
/// the CertificateStatus.
struct ExpectCertificateStatus {
    hs: HandshakeDetails,
    transcript: HandshakeHash,
    strategy: Box<dyn KeyExchangeStrategy>,
    server_cert: ServerCertDetails,
}

impl State for ExpectCertificateStatus {
    fn handle(
        mut self: Box<Self>,
        cx: &mut ClientContext<'_>,
        m: Message,
    ) -> Result<Transition, Error> {
        if !m.is_handshake_type(HandshakeType::CertificateStatus) {
            debug!("Server omitted its CertificateStatus");
            verify_server_cert(&self.hs, cx, &self.server_cert)?;
            let next = after_certificate(self.hs, self.transcript, self.strategy, self.server_cert);
            return Ok(Transition::Reuse(next, m));
        }

        cx.common
            .hash_message(&mut self.transcript, &m);
        let status = require_handshake_msg_move!(
            m,
            HandshakeType::CertificateStatus,
            HandshakePayload::CertificateStatus
        )?;
        self.server_cert.ocsp_response = status.into_inner();
        trace!(
            "Server stapled OCSP response is {:?}",
            &self.server_cert.ocsp_response
        );

        verify_server_cert(&self.hs, cx, &self.server_cert)?;
        Ok(Transition::Next(after_certificate(
            self.hs,
            self.transcript,
            self.strategy,
            self.server_cert,
        )))
    }

    fn handshake_state(&self) -> HandshakeState {
        HandshakeState::RecvCertificateStatus
    }
}

struct ExpectServerKx {
    hs: HandshakeDetails,
    transcript: HandshakeHash,
    strategy: Box<dyn KeyExchangeStrategy>,
    server_cert: Option<ServerCertDetails>,
}

impl State for ExpectServerKx {
    fn handle(
        mut self: Box<Self>,
        cx: &mut ClientContext<'_>,
        m: Message,
    ) -> Result<Transition, Error> {
        if self.strategy.server_key_exchange() == ServerKeyExchangeUse::Optional
            && !m.is_handshake_type(HandshakeType::ServerKeyExchange)
        {
            trace!("Server sent no ServerKeyExchange");
            return Transition::reuse(
                ExpectServerDoneOrCertReq {
                    hs: self.hs,
                    transcript: self.transcript,
                    strategy: self.strategy,
                    server_cert: self.server_cert,
                },
                m,
            );
        }

        let body = require_handshake_msg!(
            m,
            HandshakeType::ServerKeyExchange,
            HandshakePayload::ServerKeyExchange
        )?;

        let signed = self.hs.suite.requires_server_cert() && self.hs.suite.kx != KeyExchangeAlgorithm::RSA;
        let params = kx::decode_server_key_exchange(
            self.strategy.as_mut(),
            body.0.bytes(),
            signed,
            self.hs.version,
        )?;

        if signed {
            let cert = self
                .server_cert
                .as_ref()
                .and_then(ServerCertDetails::end_entity)
                .ok_or(Error::NoCertificatesPresented)?;
            self.strategy.verify_params_signature(
                self.hs.config.verifier.as_ref(),
                cert,
                &self.hs.randoms.client_first(),
                &params,
                self.hs.suite,
            )?;
        }

        cx.common
            .hash_message(&mut self.transcript, &m);

        Transition::next(ExpectServerDoneOrCertReq {
            hs: self.hs,
            transcript: self.transcript,
            strategy: self.strategy,
            server_cert: self.server_cert,
        })
    }

    fn handshake_state(&self) -> HandshakeState {
        HandshakeState::RecvServerKeyExchange
    }
}

struct ExpectServerDoneOrCertReq {
    hs: HandshakeDetails,
    transcript: HandshakeHash,
    strategy: Box<dyn KeyExchangeStrategy>,
    server_cert: Option<ServerCertDetails>,
}

impl State for ExpectServerDoneOrCertReq {
    fn handle(
        mut self: Box<Self>,
        cx: &mut ClientContext<'_>,
        m: Message,
    ) -> Result<Transition, Error> {
        if !m.is_handshake_type(HandshakeType::CertificateRequest) {
            self.transcript.abandon_client_auth();
            return Transition::reuse(
                ExpectServerDone {
                    hs: self.hs,
                    transcript: self.transcript,
                    strategy: self.strategy,
                    server_cert: self.server_cert,
                    client_auth: None,
                },
                m,
            );
        }

        if !self.hs.suite.requires_server_cert() {
            return Err(PeerMisbehaved::CertificateRequestForUnauthenticatedSuite.into());
        }

        let req = require_handshake_msg!(
            m,
            HandshakeType::CertificateRequest,
            HandshakePayload::CertificateRequest
        )?;
        debug!("Got CertificateRequest {:?}", req);

        let client_auth = ClientAuthDetails::resolve(
            self.hs
                .config
                .client_auth_cert_resolver
                .as_ref(),
            req,
        );

        cx.common
            .hash_message(&mut self.transcript, &m);

        Transition::next(ExpectServerDone {
            hs: self.hs,
            transcript: self.transcript,
            strategy: self.strategy,
            server_cert: self.server_cert,
            client_auth: Some(client_auth),
        })
    }

    fn handshake_state(&self) -> HandshakeState {
        HandshakeState::RecvCertificateRequest
    }
}

struct ExpectServerDone {
    hs: HandshakeDetails,
    transcript: HandshakeHash,
    strategy: Box<dyn KeyExchangeStrategy>,
    server_cert: Option<ServerCertDetails>,
    client_auth: Option<ClientAuthDetails>,
}

impl State for ExpectServerDone {
    fn handle(self: Box<Self>, cx: &mut ClientContext<'_>, m: Message) -> Result<Transition, Error> {
        check::check_message(&m, &[ContentType::Handshake], &[HandshakeType::ServerHelloDone])?;

        let Self {
            hs,
            mut transcript,
            mut strategy,
            server_cert,
            client_auth,
        } = *self;

        cx.common.hash_message(&mut transcript, &m);
        trace!("Server cert is {:?}", server_cert);

        // 1. Certificate, if the server asked for one.
        if let Some(client_auth) = &client_auth {
            cx.common
                .enter(HandshakeState::SendClientCertificate);
            let chain = match client_auth {
                ClientAuthDetails::Verify { certkey, .. } => certkey.cert.clone(),
                ClientAuthDetails::Empty => Vec::new(),
            };
            emit_certificate(&hs, &mut transcript, chain, cx)?;
        }

        // 2. ClientKeyExchange, then the master secret.
        cx.common
            .enter(HandshakeState::SendClientKeyExchange);
        let body = strategy.compute_client_key_exchange_message(&ClientKxContext {
            client_version: hs.client_version,
            server_cert: server_cert
                .as_ref()
                .and_then(ServerCertDetails::end_entity),
            secure_random: hs.config.provider.secure_random,
        })?;
        emit_client_kx(&hs, &mut transcript, body, cx)?;

        let pre_master_secret = strategy.derive_pre_master_secret()?;
        drop(strategy);
        let secrets = ConnectionSecrets::from_key_exchange(
            &pre_master_secret,
            hs.randoms,
            hs.suite,
            hs.version,
        );
        drop(pre_master_secret);

        // 3. CertificateVerify, over everything up to the ClientKeyExchange.
        let handshake_buf = transcript.take_handshake_buf();
        if let Some(ClientAuthDetails::Verify { signer, .. }) = &client_auth {
            cx.common
                .enter(HandshakeState::SendCertificateVerify);
            let message = handshake_buf
                .ok_or_else(|| Error::General("expected transcript for client auth".into()))?;
            let sig = signer.sign(&message)?;
            let payload = match hs.version {
                ProtocolVersion::TLSv1_2 => HandshakePayload::CertificateVerify(
                    DigitallySignedStruct::new(signer.scheme(), sig),
                ),
                _ => HandshakePayload::LegacyCertificateVerify(PayloadU16::new(sig)),
            };
            emit_handshake(&hs, &mut transcript, HandshakeType::CertificateVerify, payload, cx, false)?;
        }

        // 4. ChangeCipherSpec, switching our direction to the new keys.
        cx.common
            .enter(HandshakeState::SendChangeCipherSpec);
        log_master_secret(&hs.config, &secrets);
        cx.common
            .prepare_encryption(secrets.make_cipher_pair(hs.config.provider.secure_random));
        emit_ccs(&hs, cx)?;

        // 5. Finished.
        cx.common.enter(HandshakeState::SendFinished);
        emit_finished(&hs, &secrets, &mut transcript, cx)?;

        if hs.ticket_expected {
            Transition::next(ExpectNewTicket {
                hs,
                transcript,
                secrets,
                resuming: None,
            })
        } else {
            Transition::next(ExpectCcs {
                hs,
                transcript,
                secrets,
                resuming: None,
                new_ticket: None,
            })
        }
    }

    fn handshake_state(&self) -> HandshakeState {
        HandshakeState::RecvServerHelloDone
    }
}

fn emit_handshake(
    hs: &HandshakeDetails,
    transcript: &mut HandshakeHash,
    typ: HandshakeType,
    payload: HandshakePayload,
    cx: &mut ClientContext<'_>,
    must_encrypt: bool,
) -> Result<(), Error> {
    let m = Message {
        version: hs.version,
        payload: MessagePayload::handshake(HandshakeMessagePayload { typ, payload }),
    };

    cx.common.hash_message(transcript, &m);
    cx.common.send_msg(m, must_encrypt)
}

fn emit_certificate(
    hs: &HandshakeDetails,
    transcript: &mut HandshakeHash,
    chain: Vec<pki_types::CertificateDer<'static>>,
    cx: &mut ClientContext<'_>,
) -> Result<(), Error> {
    emit_handshake(
        hs,
        transcript,
        HandshakeType::Certificate,
        HandshakePayload::Certificate(CertificatePayload(chain)),
        cx,
        false,
    )
}

fn emit_client_kx(
    hs: &HandshakeDetails,
    transcript: &mut HandshakeHash,
    body: Vec<u8>,
    cx: &mut ClientContext<'_>,
) -> Result<(), Error> {
    emit_handshake(
        hs,
        transcript,
        HandshakeType::ClientKeyExchange,
        HandshakePayload::ClientKeyExchange(Payload::new(body)),
        cx,
        false,
    )
}

fn emit_ccs(hs: &HandshakeDetails, cx: &mut ClientContext<'_>) -> Result<(), Error> {
    let ccs = Message {
        version: hs.version,
        payload: MessagePayload::ChangeCipherSpec(ChangeCipherSpecPayload),
    };

    cx.common.send_msg(ccs, false)?;
    cx.common.record_layer.start_encrypting();
    Ok(())
}

fn emit_finished(
    hs: &HandshakeDetails,
    secrets: &ConnectionSecrets,
    transcript: &mut HandshakeHash,
    cx: &mut ClientContext<'_>,
) -> Result<(), Error> {
    let vh = transcript.get_current_hash();
    let verify_data = secrets.client_verify_data(&vh);

    emit_handshake(
        hs,
        transcript,
        HandshakeType::Finished,
        HandshakePayload::Finished(Payload::new(verify_data.to_vec())),
        cx,
        true,
    )
}

struct ExpectNewTicket {
    hs: HandshakeDetails,
    transcript: HandshakeHash,
    secrets: ConnectionSecrets,
    resuming: Option<Session>,
}

impl State for ExpectNewTicket {
    fn handle(
        mut self: Box<Self>,
        cx: &mut ClientContext<'_>,
        m: Message,
    ) -> Result<Transition, Error> {
        check::check_message(&m, &[ContentType::Handshake], &[HandshakeType::NewSessionTicket])?;
        cx.common
            .hash_message(&mut self.transcript, &m);

        let nst = require_handshake_msg_move!(
            m,
            HandshakeType::NewSessionTicket,
            HandshakePayload::NewSessionTicket
        )?;

        // an empty ticket means the server will not issue one after all
        let new_ticket = match nst.ticket.0.is_empty() {
            true => None,
            false => Some((nst.ticket.0, nst.lifetime_hint)),
        };

        Transition::next(ExpectCcs {
            hs: self.hs,
            transcript: self.transcript,
            secrets: self.secrets,
            resuming: self.resuming,
            new_ticket,
        })
    }

    fn handshake_state(&self) -> HandshakeState {
        HandshakeState::RecvNewSessionTicket
    }
}

struct ExpectCcs {
    hs: HandshakeDetails,
    transcript: HandshakeHash,
    secrets: ConnectionSecrets,
    resuming: Option<Session>,
    new_ticket: Option<(Vec<u8>, u32)>,
}

impl State for ExpectCcs {
    fn handle(self: Box<Self>, cx: &mut ClientContext<'_>, m: Message) -> Result<Transition, Error> {
        check::check_message(&m, &[ContentType::ChangeCipherSpec], &[])?;

        // CCS should not be received interleaved with fragmented handshake-level
        // message.
        cx.common.check_aligned_handshake()?;

        cx.common.record_layer.start_decrypting()?;

        Transition::next(ExpectFinished {
            hs: self.hs,
            transcript: self.transcript,
            secrets: self.secrets,
            resuming: self.resuming,
            new_ticket: self.new_ticket,
        })
    }

    fn handshake_state(&self) -> HandshakeState {
        HandshakeState::RecvFinished
    }
}

struct ExpectFinished {
    hs: HandshakeDetails,
    transcript: HandshakeHash,
    secrets: ConnectionSecrets,
    resuming: Option<Session>,
    new_ticket: Option<(Vec<u8>, u32)>,
}

impl ExpectFinished {
    /// Build the session this handshake established, and cache it if it
    /// can be resumed.
    fn save_session(&mut self, cx: &mut ClientContext<'_>) -> Result<(), Error> {
        let config = &self.hs.config;
        let resumption = &config.resumption;
        let now = config.current_time()?;
        let hash = self.hs.suite.common.hash_provider;
        let ticket_id = |ticket: &[u8]| SessionId::new(hash.hash(ticket).as_ref());

        let (session, store) = match (self.resuming.take(), self.new_ticket.take()) {
            (Some(resumed), None) => (resumed, false),
            (Some(resumed), Some((ticket, hint))) => (
                resumed.with_ticket(ticket_id(&ticket), ticket, hint, now, config.session_timeout),
                true,
            ),
            (None, new_ticket) => {
                let id = match &new_ticket {
                    Some((ticket, _)) => ticket_id(ticket),
                    None => self.hs.session_id,
                };
                let resumable = !id.is_empty();
                let session = Session::new(
                    id,
                    self.secrets.master_secret(),
                    self.hs.suite,
                    self.hs.version,
                    cx.data
                        .peer_certificates
                        .clone()
                        .unwrap_or_default(),
                    cx.data
                        .verify_result
                        .clone()
                        .unwrap_or(VerifyResult::NoCertificate),
                    new_ticket,
                    now,
                    config.session_timeout,
                );
                (session, resumable)
            }
        };

        if store {
            if resumption
                .store
                .insert(self.hs.server_name.clone(), session.clone())
            {
                resumption.stats.count_cache_full();
            }
        } else {
            debug!("Session not saved");
        }

        cx.data.session = Some(session);
        Ok(())
    }
}

impl State for ExpectFinished {
    fn handle(
        mut self: Box<Self>,
        cx: &mut ClientContext<'_>,
        m: Message,
    ) -> Result<Transition, Error> {
        let finished =
            require_handshake_msg!(m, HandshakeType::Finished, HandshakePayload::Finished)?;

        if finished.bytes().len() != 12 {
            return Err(InvalidMessage::InvalidFinishedLength.into());
        }

        // Work out what verify_data we expect.
        let vh = self.transcript.get_current_hash();
        let expect_verify_data = self.secrets.server_verify_data(&vh);

        // Constant-time verification of this is relatively unimportant: they only
        // get one chance.  But it can't hurt.
        let _fin_verified: FinishedMessageVerified =
            match bool::from(expect_verify_data[..].ct_eq(finished.bytes())) {
                true => FinishedMessageVerified::assertion(),
                false => return Err(PeerMisbehaved::IncorrectFinished.into()),
            };

        cx.common
            .hash_message(&mut self.transcript, &m);

        if self.resuming.is_some() {
            cx.common
                .enter(HandshakeState::SendChangeCipherSpec);
            emit_ccs(&self.hs, cx)?;
            cx.common.enter(HandshakeState::SendFinished);
            emit_finished(&self.hs, &self.secrets, &mut self.transcript, cx)?;
        }

        self.save_session(cx)?;
        cx.data.offered_session = false;
        self.hs
            .config
            .resumption
            .stats
            .count_connect_good();
        cx.common.start_traffic();

        Transition::next(ExpectTraffic {})
    }

    fn handshake_state(&self) -> HandshakeState {
        HandshakeState::RecvFinished
    }
}

struct ExpectTraffic {}

impl State for ExpectTraffic {
    fn handle(self: Box<Self>, cx: &mut ClientContext<'_>, m: Message) -> Result<Transition, Error> {
        match m.payload {
            MessagePayload::ApplicationData(payload) => cx
                .common
                .take_received_plaintext(payload),
            payload => {
                return Err(check::inappropriate_message(
                    &payload,
                    &[ContentType::ApplicationData],
                ));
            }
        }
        Ok(Transition::Next(self))
    }

    fn handshake_state(&self) -> HandshakeState {
        HandshakeState::Done
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use pki_types::CertificateDer;

    use super::super::state::{drive, HandshakeObserver};
    use super::*;
    use crate::client::ClientConnectionData;
    use crate::conn::CommonState;
    use crate::crypto::rust_crypto::hash::SHA256;
    use crate::crypto::rust_crypto::TLS_DHE_RSA_WITH_AES_128_CBC_SHA;
    use crate::enums::SignatureScheme;
    use crate::hash_hs::HandshakeHashBuffer;
    use crate::kx::ServerKxParams;
    use crate::msgs::codec::{Codec, Reader};
    use crate::msgs::handshake::{ServerDhParams, ServerKeyExchangePayload};
    use crate::verify::{HandshakeSignatureValid, ServerCertVerifier};
    use crate::version::TLS12;
    use crate::RootCertStore;

    static CA_CERT: &[u8] = include_bytes!("../../tests/data/ca.der");
    static SERVER_CERT: &[u8] = include_bytes!("../../tests/data/server-rsa.der");

    /// Delegates to a real strategy, and counts how often it is dropped.
    struct Tracked {
        inner: Box<dyn KeyExchangeStrategy>,
        drops: Arc<AtomicUsize>,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl KeyExchangeStrategy for Tracked {
        fn algorithm(&self) -> KeyExchangeAlgorithm {
            self.inner.algorithm()
        }

        fn server_key_exchange(&self) -> ServerKeyExchangeUse {
            self.inner.server_key_exchange()
        }

        fn parse_server_params(&mut self, r: &mut Reader<'_>) -> Result<(), Error> {
            self.inner.parse_server_params(r)
        }

        fn verify_params_signature(
            &self,
            verifier: &dyn ServerCertVerifier,
            server_cert: &CertificateDer<'_>,
            randoms: &[u8; 64],
            server_kx: &ServerKxParams,
            suite: SupportedCipherSuite,
        ) -> Result<HandshakeSignatureValid, Error> {
            self.inner
                .verify_params_signature(verifier, server_cert, randoms, server_kx, suite)
        }

        fn compute_client_key_exchange_message(
            &mut self,
            cx: &ClientKxContext<'_>,
        ) -> Result<Vec<u8>, Error> {
            self.inner
                .compute_client_key_exchange_message(cx)
        }

        fn derive_pre_master_secret(&mut self) -> Result<zeroize::Zeroizing<Vec<u8>>, Error> {
            self.inner.derive_pre_master_secret()
        }
    }

    #[derive(Debug, Default)]
    struct Hashed(Mutex<Vec<HandshakeType>>);

    impl HandshakeObserver for Hashed {
        fn message_hashed(&self, typ: HandshakeType, _encoded: &[u8]) {
            self.0.lock().unwrap().push(typ);
        }
    }

    fn details() -> HandshakeDetails {
        let mut roots = RootCertStore::empty();
        roots
            .add(CertificateDer::from(CA_CERT))
            .unwrap();
        let config = ClientConfig::builder()
            .with_protocol_versions(&[&TLS12])
            .unwrap()
            .with_root_certificates(roots)
            .with_no_client_auth();

        HandshakeDetails {
            config: Arc::new(config),
            server_name: ServerName::try_from("testserver.com").unwrap(),
            suite: TLS_DHE_RSA_WITH_AES_128_CBC_SHA,
            version: ProtocolVersion::TLSv1_2,
            client_version: ProtocolVersion::TLSv1_2,
            randoms: ConnectionRandoms::new([1; 32], [2; 32]),
            session_id: SessionId::empty(),
            ticket_expected: false,
            status_expected: false,
        }
    }

    fn tracked_strategy(
        hs: &HandshakeDetails,
        drops: &Arc<AtomicUsize>,
    ) -> Box<dyn KeyExchangeStrategy> {
        Box::new(Tracked {
            inner: kx::for_suite(hs.suite, &hs.config).unwrap(),
            drops: drops.clone(),
        })
    }

    fn transcript() -> HandshakeHash {
        HandshakeHashBuffer::new().start_hash(&SHA256)
    }

    fn server_cert() -> Option<ServerCertDetails> {
        Some(ServerCertDetails::new(vec![CertificateDer::from(
            SERVER_CERT.to_vec(),
        )]))
    }

    fn handshake(typ: HandshakeType, payload: HandshakePayload) -> Message {
        Message {
            version: ProtocolVersion::TLSv1_2,
            payload: MessagePayload::handshake(HandshakeMessagePayload { typ, payload }),
        }
    }

    fn server_kx(body: Vec<u8>) -> Message {
        handshake(
            HandshakeType::ServerKeyExchange,
            HandshakePayload::ServerKeyExchange(ServerKeyExchangePayload(Payload::new(body))),
        )
    }

    fn dh_params() -> Vec<u8> {
        ServerDhParams::new(&[0xff; 128], &[2], &[5]).get_encoding()
    }

    fn run(
        state: Box<dyn State>,
        m: Message,
        observer: Option<Arc<dyn HandshakeObserver>>,
    ) -> Result<Box<dyn State>, Error> {
        let mut common = CommonState::new(None, observer).unwrap();
        let mut data = ClientConnectionData::default();
        let mut cx = ClientContext {
            common: &mut common,
            data: &mut data,
        };
        drive(state, &mut cx, m)
    }

    #[test]
    fn bad_server_kx_signature_drops_key_material() {
        let drops = Arc::new(AtomicUsize::new(0));
        let hs = details();
        let strategy = tracked_strategy(&hs, &drops);

        let mut body = dh_params();
        DigitallySignedStruct::new(SignatureScheme::RSA_PKCS1_SHA256, vec![0x55; 256])
            .encode(&mut body);
        let state = Box::new(ExpectServerKx {
            hs,
            transcript: transcript(),
            strategy,
            server_cert: server_cert(),
        });

        assert!(run(state, server_kx(body), None).is_err());
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn truncated_server_kx_drops_key_material() {
        let drops = Arc::new(AtomicUsize::new(0));
        let hs = details();
        let strategy = tracked_strategy(&hs, &drops);

        let mut body = dh_params();
        body.pop();
        let state = Box::new(ExpectServerKx {
            hs,
            transcript: transcript(),
            strategy,
            server_cert: server_cert(),
        });

        assert!(matches!(
            run(state, server_kx(body), None).err(),
            Some(Error::InvalidMessage(_))
        ));
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unexpected_message_drops_key_material() {
        let drops = Arc::new(AtomicUsize::new(0));
        let hs = details();
        let strategy = tracked_strategy(&hs, &drops);
        let state = Box::new(ExpectServerDone {
            hs,
            transcript: transcript(),
            strategy,
            server_cert: server_cert(),
            client_auth: None,
        });

        let finished = handshake(
            HandshakeType::Finished,
            HandshakePayload::Finished(Payload::new(vec![0; 12])),
        );
        assert!(matches!(
            run(state, finished, None).err(),
            Some(Error::InappropriateHandshakeMessage { .. })
        ));
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_client_key_exchange_drops_key_material() {
        // no ServerKeyExchange was parsed, so there is nothing to agree with
        let drops = Arc::new(AtomicUsize::new(0));
        let hs = details();
        let strategy = tracked_strategy(&hs, &drops);
        let state = Box::new(ExpectServerDone {
            hs,
            transcript: transcript(),
            strategy,
            server_cert: server_cert(),
            client_auth: None,
        });

        let done = handshake(
            HandshakeType::ServerHelloDone,
            HandshakePayload::ServerHelloDone,
        );
        assert!(run(state, done, None).is_err());
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn wrong_message_is_not_hashed_as_certificate() {
        let drops = Arc::new(AtomicUsize::new(0));
        let hs = details();
        let strategy = tracked_strategy(&hs, &drops);
        let observer = Arc::new(Hashed::default());
        let state = Box::new(ExpectCertificate {
            hs,
            transcript: transcript(),
            strategy,
        });

        let done = handshake(
            HandshakeType::ServerHelloDone,
            HandshakePayload::ServerHelloDone,
        );
        assert!(run(state, done, Some(observer.clone() as Arc<dyn HandshakeObserver>)).is_err());
        assert!(observer.0.lock().unwrap().is_empty());
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
