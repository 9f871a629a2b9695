use std::sync::Arc;

use pki_types::ServerName;

use super::client_conn::ClientConfig;
use super::common::ClientHelloDetails;
use super::state::{ClientContext, HandshakeState, State, Transition};
use super::tls12;
use crate::enums::{CipherSuite, HandshakeType, ProtocolVersion};
use crate::error::{Error, PeerIncompatible, PeerMisbehaved};
use crate::hash_hs::HandshakeHashBuffer;
use crate::kx;
#[cfg(feature = "logging")]
use crate::log::{debug, trace};
use crate::msgs::base::{Payload, PayloadU8};
use crate::msgs::enums::{Compression, ECPointFormat, ExtensionType};
use crate::msgs::handshake::{
    ClientExtension, ClientHelloPayload, ClientSessionTicket, HandshakeMessagePayload,
    HandshakePayload, OcspCertificateStatusRequest, Random, ServerHelloPayload, SessionId,
};
use crate::msgs::message::{Message, MessagePayload};
use crate::session::{Session, VerifyResult};
use crate::suites::SupportedCipherSuite;
use crate::tls12::{ConnectionRandoms, ConnectionSecrets};

/// The cipher suites we can offer with `config`, in preference order.
fn offerable_suites(config: &ClientConfig) -> Vec<SupportedCipherSuite> {
    let max = config.versions.max();
    config
        .provider
        .cipher_suites
        .iter()
        .copied()
        .filter(|suite| suite.usable_for_version(max))
        .filter(|suite| !suite.uses_psk() || config.psk.is_some())
        .filter(|suite| !suite.uses_srp() || config.srp.is_some())
        .collect()
}

/// The cached session for `server_name` we may offer, if any.
///
/// Expired sessions are forgotten here.
fn find_session(
    config: &ClientConfig,
    server_name: &ServerName<'static>,
    offered: &[SupportedCipherSuite],
) -> Result<Option<Session>, Error> {
    let resumption = &config.resumption;
    let Some(session) = resumption.store.lookup(server_name) else {
        return Ok(None);
    };

    if session.has_expired(config.current_time()?) {
        debug!("Cached session for {:?} has expired", server_name);
        resumption.stats.count_timeout();
        resumption.store.remove(server_name);
        return Ok(None);
    }

    if !config.versions.contains(session.version()) {
        debug!("Not resuming: {:?} is not enabled", session.version());
        return Ok(None);
    }

    if !offered.contains(&session.suite()) {
        debug!("Not resuming: {:?} is not offered", session.suite().common.suite);
        return Ok(None);
    }

    if session.ticket().is_some() && !resumption.tickets {
        debug!("Not resuming: session tickets are disabled");
        return Ok(None);
    }

    Ok(Some(session))
}

/// Build and queue the ClientHello, returning the state that waits for
/// the ServerHello.
pub(super) fn start_handshake(
    config: Arc<ClientConfig>,
    server_name: ServerName<'static>,
    cx: &mut ClientContext<'_>,
) -> Result<Box<dyn State>, Error> {
    cx.common.enter(HandshakeState::SendClientHello);
    config.resumption.stats.count_connect();

    let offered_suites = offerable_suites(&config);
    let resuming = find_session(&config, &server_name, &offered_suites)?;

    let mut transcript_buffer = HandshakeHashBuffer::new();
    if config
        .client_auth_cert_resolver
        .has_certs()
    {
        transcript_buffer.set_client_auth_enabled();
    }

    let random = Random::new(config.provider.secure_random)?;
    let client_version = config.versions.max();

    let mut exts = Vec::new();
    if config.enable_sni {
        if let ServerName::DnsName(dns_name) = &server_name {
            exts.push(ClientExtension::make_sni(dns_name));
        }
    }

    if offered_suites
        .iter()
        .any(|suite| suite.uses_ecc())
    {
        exts.push(ClientExtension::NamedGroups(
            config
                .provider
                .kx_groups
                .iter()
                .map(|group| group.name())
                .collect(),
        ));
        exts.push(ClientExtension::ECPointFormats(vec![
            ECPointFormat::Uncompressed,
        ]));
    }

    if client_version == ProtocolVersion::TLSv1_2 {
        exts.push(ClientExtension::SignatureAlgorithms(
            config.verifier.supported_verify_schemes(),
        ));
    }

    if config.resumption.tickets {
        let ticket = match resuming
            .as_ref()
            .and_then(|session| session.ticket())
        {
            Some(ticket) => ClientSessionTicket::Offer(Payload::new(ticket.to_vec())),
            None => ClientSessionTicket::Request,
        };
        exts.push(ClientExtension::SessionTicket(ticket));
    }

    if config.ocsp_stapling || config.verifier.request_ocsp_response() {
        exts.push(ClientExtension::CertificateStatusRequest(
            OcspCertificateStatusRequest::default(),
        ));
    }

    if let Some(srp) = &config.srp {
        if offered_suites
            .iter()
            .any(|suite| suite.uses_srp())
        {
            exts.push(ClientExtension::SrpUserName(PayloadU8::new(
                srp.username.clone(),
            )));
        }
    }

    let mut hello = ClientHelloDetails::new();
    hello.sent_extensions = exts
        .iter()
        .map(ClientExtension::ext_type)
        .collect();

    let session_id = match &resuming {
        Some(session) => {
            debug!("Resuming session {:?}", session);
            session.session_id()
        }
        None => SessionId::empty(),
    };

    let mut cipher_suites: Vec<CipherSuite> = offered_suites
        .iter()
        .map(|suite| suite.common.suite)
        .collect();
    cipher_suites.push(CipherSuite::TLS_EMPTY_RENEGOTIATION_INFO_SCSV);

    let ch = Message {
        version: ProtocolVersion::TLSv1_0,
        payload: MessagePayload::handshake(HandshakeMessagePayload {
            typ: HandshakeType::ClientHello,
            payload: HandshakePayload::ClientHello(ClientHelloPayload {
                client_version,
                random,
                session_id,
                cipher_suites,
                compression_methods: vec![Compression::Null],
                extensions: exts,
            }),
        }),
    };

    trace!("Sending ClientHello {:#?}", ch);
    cx.common
        .hash_early_message(&mut transcript_buffer, &ch);
    cx.common.send_msg(ch, false)?;
    cx.data.offered_session = resuming.is_some();

    cx.common.enter(HandshakeState::RecvServerHello);
    Ok(Box::new(ExpectServerHello {
        config,
        server_name,
        resuming,
        random,
        client_version,
        offered_suites,
        hello,
        transcript_buffer,
    }))
}

struct ExpectServerHello {
    config: Arc<ClientConfig>,
    server_name: ServerName<'static>,
    resuming: Option<Session>,
    random: Random,
    client_version: ProtocolVersion,
    offered_suites: Vec<SupportedCipherSuite>,
    hello: ClientHelloDetails,
    transcript_buffer: HandshakeHashBuffer,
}

impl ExpectServerHello {
    /// Check `server_hello` against what we offered, returning the
    /// negotiated version and suite.
    fn check_server_hello(
        &self,
        cx: &mut ClientContext<'_>,
        server_hello: &ServerHelloPayload,
    ) -> Result<(ProtocolVersion, SupportedCipherSuite), Error> {
        let version = server_hello.server_version;
        if !self.config.versions.contains(version) {
            return Err(PeerIncompatible::ServerVersionNotEnabled.into());
        }

        if server_hello.compression_method != Compression::Null {
            return Err(PeerMisbehaved::SelectedUnofferedCompression.into());
        }

        if server_hello.has_duplicate_extension() {
            return Err(PeerMisbehaved::DuplicateServerHelloExtensions.into());
        }

        let allowed_unsolicited = [ExtensionType::RenegotiationInfo];
        if self
            .hello
            .server_sent_unsolicited_extensions(&server_hello.extensions, &allowed_unsolicited)
        {
            return Err(PeerMisbehaved::UnsolicitedServerHelloExtension.into());
        }

        if let Some(info) = server_hello.renegotiation_info() {
            if !info.is_empty() {
                return Err(PeerMisbehaved::NonEmptyRenegotiationInfo.into());
            }
            cx.data.secure_renegotiation = true;
        }

        let suite = self
            .offered_suites
            .iter()
            .copied()
            .find(|suite| suite.common.suite == server_hello.cipher_suite)
            .ok_or(PeerMisbehaved::SelectedUnofferedCipherSuite)?;

        if !suite.usable_for_version(version) {
            return Err(PeerMisbehaved::SelectedCipherSuiteInvalidForVersion.into());
        }

        if let Some(formats) = server_hello.ecpoints_extension() {
            if !formats.contains(&ECPointFormat::Uncompressed) {
                return Err(PeerMisbehaved::ServerHelloMustOfferUncompressedEcPoints.into());
            }
        }

        Ok((version, suite))
    }
}

impl State for ExpectServerHello {
    fn handle(self: Box<Self>, cx: &mut ClientContext<'_>, m: Message) -> Result<Transition, Error> {
        let server_hello =
            require_handshake_msg!(m, HandshakeType::ServerHello, HandshakePayload::ServerHello)?;
        trace!("We got ServerHello {:#?}", server_hello);

        let (version, suite) = self.check_server_hello(cx, server_hello)?;
        debug!("Using {:?} with {:?}", version, suite);

        cx.common.negotiated_version = Some(version);
        cx.common.suite = Some(suite);

        let this = *self;
        let mut transcript = this
            .transcript_buffer
            .start_hash(suite.transcript_hash_for(version));
        cx.common.hash_message(&mut transcript, &m);

        let hs = tls12::HandshakeDetails {
            config: this.config,
            server_name: this.server_name,
            suite,
            version,
            client_version: this.client_version,
            randoms: ConnectionRandoms::new(this.random.0, server_hello.random.0),
            session_id: server_hello.session_id,
            ticket_expected: server_hello.ticket_acked(),
            status_expected: server_hello.status_acked(),
        };
        let stats = &hs.config.resumption.stats;

        let resumed = match this.resuming {
            Some(resuming)
                if !hs.session_id.is_empty() && hs.session_id == resuming.session_id() =>
            {
                resuming
            }
            _ => {
                stats.count_miss();
                if !suite.requires_server_cert() {
                    cx.data.verify_result = Some(VerifyResult::NoCertificate);
                }
                let strategy = kx::for_suite(suite, &hs.config)?;
                return Ok(tls12::after_server_hello(hs, transcript, strategy));
            }
        };

        if resumed.suite() != suite {
            return Err(PeerMisbehaved::ResumedSessionWithVariedCipherSuite.into());
        }
        if resumed.version() != version {
            return Err(PeerMisbehaved::ResumedSessionWithVariedVersion.into());
        }

        debug!("Server agreed to resume");
        stats.count_hit();
        cx.data.resumed = true;
        cx.data.peer_certificates = Some(resumed.server_cert_chain().to_vec());
        cx.data.verify_result = Some(resumed.verify_result().clone());

        let secrets =
            ConnectionSecrets::new_resume(hs.randoms, suite, version, resumed.master_secret());
        tls12::log_master_secret(&hs.config, &secrets);
        cx.common
            .prepare_encryption(secrets.make_cipher_pair(hs.config.provider.secure_random));

        Ok(tls12::after_resumption(hs, transcript, secrets, resumed))
    }

    fn handshake_state(&self) -> HandshakeState {
        HandshakeState::RecvServerHello
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::rust_crypto::{
        TLS_DHE_RSA_WITH_AES_128_CBC_SHA, TLS_PSK_WITH_AES_128_CBC_SHA,
        TLS_RSA_WITH_AES_128_CBC_SHA256, TLS_SRP_SHA_WITH_AES_128_CBC_SHA,
    };
    use crate::kx::{PskIdentity, SrpCredentials, StaticPskIdentity};
    use crate::version::{TLS10, TLS12};
    use crate::{RootCertStore, SupportedProtocolVersion};

    fn config(versions: &[&'static SupportedProtocolVersion]) -> ClientConfig {
        ClientConfig::builder()
            .with_protocol_versions(versions)
            .unwrap()
            .with_root_certificates(RootCertStore::empty())
            .with_no_client_auth()
    }

    #[test]
    fn psk_and_srp_need_credentials() {
        let mut cfg = config(&[&TLS12]);
        let offered = offerable_suites(&cfg);
        assert!(!offered.contains(&TLS_PSK_WITH_AES_128_CBC_SHA));
        assert!(!offered.contains(&TLS_SRP_SHA_WITH_AES_128_CBC_SHA));
        assert!(offered.contains(&TLS_DHE_RSA_WITH_AES_128_CBC_SHA));

        cfg.psk = Some(Arc::new(StaticPskIdentity::new(PskIdentity::new(
            b"id".to_vec(),
            b"key".to_vec(),
        ))));
        cfg.srp = Some(SrpCredentials::new("user", "pass"));
        let offered = offerable_suites(&cfg);
        assert!(offered.contains(&TLS_PSK_WITH_AES_128_CBC_SHA));
        assert!(offered.contains(&TLS_SRP_SHA_WITH_AES_128_CBC_SHA));
    }

    #[test]
    fn tls12_only_suites_not_offered_at_tls10() {
        let cfg = config(&[&TLS10]);
        let offered = offerable_suites(&cfg);
        assert!(!offered.contains(&TLS_RSA_WITH_AES_128_CBC_SHA256));
        assert!(offered.contains(&TLS_DHE_RSA_WITH_AES_128_CBC_SHA));
    }

    #[test]
    fn no_cached_session_offers_nothing() {
        let cfg = config(&[&TLS12]);
        let name = ServerName::try_from("example.com").unwrap();
        let offered = offerable_suites(&cfg);
        assert!(find_session(&cfg, &name, &offered)
            .unwrap()
            .is_none());
    }
}
