#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
pub use std::sync::Arc;
use std::sync::Mutex;

use pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName};
use rsa::pkcs8::DecodePrivateKey;
use rsa::BigUint;
use sha1::{Digest, Sha1};
use tlsconnect::client::{HandshakeStatus, WantsClientCert};
use tlsconnect::crypto::cipher::{
    BorrowedPlainMessage, DirectionKeys, MessageDecrypter, MessageEncrypter, OpaqueMessage,
};
use tlsconnect::crypto::signer::SigningKey;
use tlsconnect::crypto::{rust_crypto, ActiveKeyExchange, CryptoProvider, KeyExchangeAlgorithm};
use tlsconnect::internal::msgs::alert::AlertMessagePayload;
use tlsconnect::internal::msgs::base::{Payload, PayloadU16, PayloadU8};
use tlsconnect::internal::msgs::codec::{Codec, Reader};
use tlsconnect::internal::msgs::enums::{
    AlertLevel, ClientCertificateType, Compression, ECPointFormat, ExtensionType,
};
use tlsconnect::internal::msgs::handshake::{
    CertificatePayload, CertificateRequestPayload, CertificateStatus, ClientHelloPayload,
    ClientSessionTicket, HandshakeMessagePayload, HandshakePayload,
    NewSessionTicketPayload, Random, ServerDhParams, ServerEcdhParams, ServerExtension,
    ServerHelloPayload, ServerKeyExchangePayload, ServerSrpParams, SessionId,
};
use tlsconnect::{
    AlertDescription, ClientConfig, ClientConnection, ConfigBuilder, ContentType, Error,
    HandshakeType, ProtocolVersion, RootCertStore, ServerCertVerifier, SignatureScheme,
    SupportedCipherSuite, SupportedProtocolVersion, WebPkiServerVerifier,
};

macro_rules! embed_files {
    (
        $(
            ($name:ident, $file:expr);
        )+
    ) => {
        $(
            const $name: &'static [u8] = include_bytes!(
                concat!("../data/", $file));
        )+
    }
}

embed_files! {
    (CA_CERT, "ca.der");
    (SERVER_RSA_CERT, "server-rsa.der");
    (SERVER_RSA_KEY, "server-rsa.key.der");
    (SERVER_ECDSA_CERT, "server-ecdsa.der");
    (SERVER_ECDSA_KEY, "server-ecdsa.key.der");
    (CLIENT_RSA_CERT, "client-rsa.der");
    (CLIENT_RSA_KEY, "client-rsa.key.der");
}

/// The name in both server certificates.
pub const SERVER_NAME: &str = "testserver.com";

/// RFC 7919 ffdhe2048.
const FFDHE2048_P: &str = "FFFFFFFFFFFFFFFFADF85458A2BB4A9AAFDC5620273D3CF1D8B9C583CE2D3695\
    A9E13641146433FBCC939DCE249B3EF97D2FE363630C75D8F681B202AEC4617A\
    D3DF1ED5D5FD65612433F51F5F066ED0856365553DED1AF3B557135E7F57C935\
    984F0C70E0E68B77E2A689DAF3EFE8721DF158A136ADE73530ACCA4F483A797A\
    BC0AB182B324FB61D108A94BB2C8E3FBB96ADAB760D7F4681D4F42A3DE394DF4\
    AE56EDE76372BB190B07A7C8EE0A6D709E02FCE1CDF7E2ECC03404CD28342F61\
    9172FE9CE98583FF8E4F1232EEF28183C3FE3B1B4C6FAD733BB5FCBC2EC22005\
    C58EF1837D1683B2C6F34A26C1B2EFFA886B423861285C97FFFFFFFFFFFFFFFF";

/// RFC 5054 1024-bit group, generator 2.
const SRP_1024_N: &str = "EEAF0AB9ADB38DD69C33F80AFA8FC5E86072618775FF3C0B9EA2314C9C256576\
                          D674DF7496EA81D3383B4813D692C6E0E0D5D8E250B98BE48E495C1D6089DAD1\
                          5DC7D7B46154D6B6CE8EF4AD69B15D4982559B297BCF1885C529F566660E57EC\
                          68EDBC3C05726CC02FD4CBF4976EAA9AFD5138FE8376435B9FC61D2FC0EB06E3";

const SRP_SALT: &[u8] = b"scripted-salt";

pub fn unhex(s: &str) -> Vec<u8> {
    let digits: Vec<u8> = s
        .bytes()
        .filter(|b| b.is_ascii_hexdigit())
        .collect();
    digits
        .chunks(2)
        .map(|pair| u8::from_str_radix(std::str::from_utf8(pair).unwrap(), 16).unwrap())
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyType {
    Rsa,
    Ecdsa,
}

impl KeyType {
    pub fn cert_chain(&self) -> Vec<CertificateDer<'static>> {
        let leaf = match self {
            Self::Rsa => SERVER_RSA_CERT,
            Self::Ecdsa => SERVER_ECDSA_CERT,
        };
        vec![
            CertificateDer::from(leaf.to_vec()),
            CertificateDer::from(CA_CERT.to_vec()),
        ]
    }

    pub fn key_der(&self) -> &'static [u8] {
        match self {
            Self::Rsa => SERVER_RSA_KEY,
            Self::Ecdsa => SERVER_ECDSA_KEY,
        }
    }

    pub fn key(&self) -> PrivateKeyDer<'static> {
        PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.key_der().to_vec()))
    }
}

pub fn ca_cert() -> CertificateDer<'static> {
    CertificateDer::from(CA_CERT.to_vec())
}

pub fn client_cert_chain() -> Vec<CertificateDer<'static>> {
    vec![CertificateDer::from(CLIENT_RSA_CERT.to_vec())]
}

pub fn client_key() -> PrivateKeyDer<'static> {
    PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(CLIENT_RSA_KEY.to_vec()))
}

pub fn server_name() -> ServerName<'static> {
    ServerName::try_from(SERVER_NAME).unwrap()
}

pub fn root_store() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    roots.add(ca_cert()).unwrap();
    roots
}

pub fn provider_with_suites(suites: &[SupportedCipherSuite]) -> CryptoProvider {
    CryptoProvider {
        cipher_suites: suites.to_vec(),
        ..rust_crypto::default_provider()
    }
}

pub fn config_builder(
    suites: &[SupportedCipherSuite],
    versions: &[&'static SupportedProtocolVersion],
) -> ConfigBuilder<ClientConfig, WantsClientCert> {
    ClientConfig::builder_with_provider(Arc::new(provider_with_suites(suites)))
        .with_protocol_versions(versions)
        .unwrap()
        .with_root_certificates(root_store())
}

pub fn make_client_config(
    suites: &[SupportedCipherSuite],
    versions: &[&'static SupportedProtocolVersion],
) -> ClientConfig {
    config_builder(suites, versions).with_no_client_auth()
}

pub fn make_client(config: &Arc<ClientConfig>) -> ClientConnection {
    ClientConnection::new(Arc::clone(config), server_name()).unwrap()
}

/// Session state the scripted server keeps between connections.
#[derive(Debug, Default)]
pub struct ServerCache {
    by_id: Mutex<HashMap<Vec<u8>, [u8; 48]>>,
    by_ticket: Mutex<HashMap<Vec<u8>, [u8; 48]>>,
    tickets_issued: Mutex<u32>,
}

impl ServerCache {
    pub fn forget_all(&self) {
        self.by_id.lock().unwrap().clear();
        self.by_ticket.lock().unwrap().clear();
    }
}

/// How the scripted server behaves.
#[derive(Clone)]
pub struct ServerOptions {
    pub version: ProtocolVersion,
    pub suite: SupportedCipherSuite,
    pub key_type: KeyType,
    /// The certificate chain sent; defaults to `key_type`'s.
    pub cert_chain: Option<Vec<CertificateDer<'static>>>,
    pub psk: Option<(Vec<u8>, Vec<u8>)>,
    pub psk_hint: Option<Vec<u8>>,
    /// SRP username and password the verifier is made from.
    pub srp: Option<(Vec<u8>, Vec<u8>)>,
    /// Use this ServerHello random instead of a fresh one.
    pub server_random: Option<[u8; 32]>,
    pub issue_session_ids: bool,
    pub issue_tickets: bool,
    /// Send an empty NewSessionTicket instead of a real one.
    pub empty_ticket: bool,
    pub ticket_lifetime_hint: u32,
    pub request_client_cert: bool,
    pub ocsp_response: Option<Vec<u8>>,
    pub renegotiation_info: bool,
    pub hello_tweak: Option<fn(&mut ServerHelloPayload)>,
    pub corrupt_finished: bool,
    pub cache: Arc<ServerCache>,
}

impl ServerOptions {
    pub fn new(version: ProtocolVersion, suite: SupportedCipherSuite) -> Self {
        Self {
            version,
            suite,
            key_type: KeyType::Rsa,
            cert_chain: None,
            psk: None,
            psk_hint: None,
            srp: None,
            server_random: None,
            issue_session_ids: true,
            issue_tickets: false,
            empty_ticket: false,
            ticket_lifetime_hint: 0,
            request_client_cert: false,
            ocsp_response: None,
            renegotiation_info: true,
            hello_tweak: None,
            corrupt_finished: false,
            cache: Arc::new(ServerCache::default()),
        }
    }

    pub fn with_key_type(mut self, key_type: KeyType) -> Self {
        self.key_type = key_type;
        self
    }

    pub fn with_psk(mut self, identity: &[u8], key: &[u8]) -> Self {
        self.psk = Some((identity.to_vec(), key.to_vec()));
        self
    }

    pub fn with_srp(mut self, username: &[u8], password: &[u8]) -> Self {
        self.srp = Some((username.to_vec(), password.to_vec()));
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Expect {
    ClientHello,
    ClientFlight,
    ResumedFinished,
    Traffic,
}

/// A TLS 1.0-1.2 server that follows a fixed script, for driving a
/// `ClientConnection` without a network.
///
/// It handles records as soon as they are written to it, and queues its
/// replies in `outgoing`.
pub struct ScriptedServer {
    pub opts: ServerOptions,
    provider: CryptoProvider,
    expect: Expect,
    incoming: Vec<u8>,
    pub outgoing: Vec<u8>,
    handshake_buf: Vec<u8>,
    transcript: Vec<u8>,
    cert_verify_transcript: Vec<u8>,
    client_random: [u8; 32],
    server_random: [u8; 32],
    session_id: SessionId,
    resumed: bool,
    ticket_acked: bool,
    status_acked: bool,
    kx: Option<Box<dyn ActiveKeyExchange>>,
    srp: Option<SrpServerState>,
    master_secret: Option<[u8; 48]>,
    pending_decrypter: Option<Box<dyn MessageDecrypter>>,
    pending_encrypter: Option<Box<dyn MessageEncrypter>>,
    decrypter: Option<Box<dyn MessageDecrypter>>,
    encrypter: Option<Box<dyn MessageEncrypter>>,
    read_seq: u64,
    write_seq: u64,
    pub client_hello: Option<ClientHelloPayload>,
    pub client_certs: Option<Vec<CertificateDer<'static>>>,
    pub client_cert_verified: bool,
    /// The body of the client's ClientKeyExchange.
    pub client_kx: Vec<u8>,
    pub client_verify_data: Vec<u8>,
    pub server_verify_data: Vec<u8>,
    pub handshake_complete: bool,
    pub alerts: Vec<(AlertLevel, AlertDescription)>,
    pub app_data: Vec<u8>,
}

impl ScriptedServer {
    pub fn new(opts: ServerOptions) -> Self {
        Self {
            opts,
            provider: rust_crypto::default_provider(),
            expect: Expect::ClientHello,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            handshake_buf: Vec::new(),
            transcript: Vec::new(),
            cert_verify_transcript: Vec::new(),
            client_random: [0u8; 32],
            server_random: [0u8; 32],
            session_id: SessionId::empty(),
            resumed: false,
            ticket_acked: false,
            status_acked: false,
            kx: None,
            srp: None,
            master_secret: None,
            pending_decrypter: None,
            pending_encrypter: None,
            decrypter: None,
            encrypter: None,
            read_seq: 0,
            write_seq: 0,
            client_hello: None,
            client_certs: None,
            client_cert_verified: false,
            client_kx: Vec::new(),
            client_verify_data: Vec::new(),
            server_verify_data: Vec::new(),
            handshake_complete: false,
            alerts: Vec::new(),
            app_data: Vec::new(),
        }
    }

    pub fn resumed(&self) -> bool {
        self.resumed
    }

    pub fn master_secret(&self) -> Option<[u8; 48]> {
        self.master_secret
    }

    pub fn session_id(&self) -> &[u8] {
        self.session_id.as_ref()
    }

    pub fn fatal_alert_received(&self) -> Option<AlertDescription> {
        self.alerts
            .iter()
            .find(|(level, _)| *level == AlertLevel::Fatal)
            .map(|(_, desc)| *desc)
    }

    /// Take bytes written by the client.
    pub fn receive(&mut self, bytes: &[u8]) {
        self.incoming.extend_from_slice(bytes);

        loop {
            let mut rd = Reader::init(&self.incoming);
            let opaque = match OpaqueMessage::read(&mut rd) {
                Ok(opaque) => opaque,
                Err(_) => return,
            };
            let used = rd.used();
            self.incoming.drain(..used);
            self.receive_record(opaque);
        }
    }

    fn receive_record(&mut self, opaque: OpaqueMessage) {
        let (typ, payload) = match &mut self.decrypter {
            Some(decrypter) => {
                let plain = decrypter
                    .decrypt(opaque, self.read_seq)
                    .expect("client record did not decrypt");
                self.read_seq += 1;
                (plain.typ, plain.payload.bytes().to_vec())
            }
            None => (opaque.typ, opaque.payload),
        };

        match typ {
            ContentType::Alert => {
                let alert = AlertMessagePayload::read_bytes(&payload).unwrap();
                self.alerts
                    .push((alert.level, alert.description));
            }
            ContentType::ChangeCipherSpec => {
                assert_eq!(payload, [0x01]);
                self.decrypter = Some(
                    self.pending_decrypter
                        .take()
                        .expect("ChangeCipherSpec before keys"),
                );
                self.read_seq = 0;
            }
            ContentType::Handshake => {
                self.handshake_buf
                    .extend_from_slice(&payload);
                self.drain_handshake();
            }
            ContentType::ApplicationData => {
                assert_eq!(self.expect, Expect::Traffic);
                self.app_data.extend_from_slice(&payload);
            }
            _ => panic!("unexpected content type {typ:?}"),
        }
    }

    fn drain_handshake(&mut self) {
        while self.handshake_buf.len() >= 4 {
            let len = u32::from_be_bytes([
                0,
                self.handshake_buf[1],
                self.handshake_buf[2],
                self.handshake_buf[3],
            ]) as usize;
            if self.handshake_buf.len() < 4 + len {
                return;
            }
            let raw: Vec<u8> = self.handshake_buf.drain(..4 + len).collect();
            self.handle_handshake(&raw);
        }
    }

    fn handle_handshake(&mut self, raw: &[u8]) {
        let msg = HandshakeMessagePayload::read_version(&mut Reader::init(raw), self.opts.version)
            .expect("client handshake message did not decode");

        match (self.expect, msg.payload) {
            (Expect::ClientHello, HandshakePayload::ClientHello(hello)) => {
                self.transcript.extend_from_slice(raw);
                self.handle_client_hello(hello);
            }
            (Expect::ClientFlight, HandshakePayload::Certificate(certs)) => {
                self.transcript.extend_from_slice(raw);
                self.client_certs = Some(certs.0);
            }
            (Expect::ClientFlight, HandshakePayload::ClientKeyExchange(body)) => {
                self.transcript.extend_from_slice(raw);
                self.cert_verify_transcript = self.transcript.clone();
                self.client_kx = body.bytes().to_vec();
                let pre_master = self.pre_master_secret(body.bytes());
                self.derive_keys(&pre_master);
            }
            (Expect::ClientFlight, HandshakePayload::CertificateVerify(dss)) => {
                self.client_cert_verified = self
                    .verifier()
                    .verify_tls12_signature(
                        &self.cert_verify_transcript,
                        &self.client_leaf(),
                        &dss,
                    )
                    .is_ok();
                self.transcript.extend_from_slice(raw);
            }
            (Expect::ClientFlight, HandshakePayload::LegacyCertificateVerify(sig)) => {
                self.client_cert_verified = self
                    .verifier()
                    .verify_legacy_signature(
                        &self.cert_verify_transcript,
                        &self.client_leaf(),
                        &sig.0,
                    )
                    .is_ok();
                self.transcript.extend_from_slice(raw);
            }
            (Expect::ClientFlight, HandshakePayload::Finished(verify_data)) => {
                self.check_client_finished(verify_data.bytes());
                self.transcript.extend_from_slice(raw);
                if self.opts.issue_tickets && self.ticket_acked {
                    self.send_new_ticket();
                }
                self.send_ccs();
                self.send_finished();
                self.handshake_complete = true;
                self.expect = Expect::Traffic;
            }
            (Expect::ResumedFinished, HandshakePayload::Finished(verify_data)) => {
                self.check_client_finished(verify_data.bytes());
                self.transcript.extend_from_slice(raw);
                self.handshake_complete = true;
                self.expect = Expect::Traffic;
            }
            (expect, payload) => panic!("server in {expect:?} got {payload:?}"),
        }
    }

    fn handle_client_hello(&mut self, hello: ClientHelloPayload) {
        let secure_random = self.provider.secure_random;
        self.client_random = hello.random.0;
        match self.opts.server_random {
            Some(random) => self.server_random = random,
            None => secure_random
                .fill(&mut self.server_random)
                .unwrap(),
        }

        let offered_ticket = match hello.ticket_extension() {
            Some(ClientSessionTicket::Offer(ticket)) => Some(ticket.bytes().to_vec()),
            _ => None,
        };
        self.ticket_acked = hello.ticket_extension().is_some() && self.opts.issue_tickets;
        self.status_acked = self.opts.ocsp_response.is_some()
            && hello
                .find_extension(ExtensionType::StatusRequest)
                .is_some();

        let cache = Arc::clone(&self.opts.cache);
        let by_ticket = offered_ticket.and_then(|ticket| {
            cache
                .by_ticket
                .lock()
                .unwrap()
                .get(&ticket)
                .copied()
        });
        let by_id = cache
            .by_id
            .lock()
            .unwrap()
            .get(hello.session_id.as_ref())
            .copied();
        let resume = match (by_ticket, by_id) {
            (Some(master), _) if !hello.session_id.is_empty() => Some(master),
            (_, Some(master)) if !hello.session_id.is_empty() => Some(master),
            _ => None,
        };

        self.session_id = match resume {
            Some(_) => hello.session_id,
            None if self.opts.issue_session_ids => SessionId::random(secure_random).unwrap(),
            None => SessionId::empty(),
        };

        let mut extensions = Vec::new();
        if self.opts.renegotiation_info {
            extensions.push(ServerExtension::make_empty_renegotiation_info());
        }
        if uses_ecc(self.opts.suite)
            && hello
                .find_extension(ExtensionType::ECPointFormats)
                .is_some()
        {
            extensions.push(ServerExtension::ECPointFormats(vec![
                ECPointFormat::Uncompressed,
            ]));
        }
        if self.ticket_acked {
            extensions.push(ServerExtension::SessionTicketAck);
        }
        if self.status_acked && resume.is_none() {
            extensions.push(ServerExtension::CertificateStatusAck);
        }

        let mut server_hello = ServerHelloPayload {
            server_version: self.opts.version,
            random: Random(self.server_random),
            session_id: self.session_id,
            cipher_suite: self.opts.suite.common.suite,
            compression_method: Compression::Null,
            extensions,
        };
        if let Some(tweak) = self.opts.hello_tweak {
            tweak(&mut server_hello);
        }
        self.client_hello = Some(hello);
        self.send_handshake(
            HandshakeType::ServerHello,
            HandshakePayload::ServerHello(server_hello),
        );

        if let Some(master) = resume {
            self.resumed = true;
            self.master_secret = Some(master);
            self.make_cipher_pair(&master);
            if self.ticket_acked {
                self.send_new_ticket();
            }
            self.send_ccs();
            self.send_finished();
            self.expect = Expect::ResumedFinished;
            return;
        }

        self.send_full_flight();
        self.expect = Expect::ClientFlight;
    }

    fn send_full_flight(&mut self) {
        let suite = self.opts.suite;
        if suite.requires_server_cert() {
            let chain = self
                .opts
                .cert_chain
                .clone()
                .unwrap_or_else(|| self.opts.key_type.cert_chain());
            self.send_handshake(
                HandshakeType::Certificate,
                HandshakePayload::Certificate(CertificatePayload(chain)),
            );
        }

        if self.status_acked {
            let ocsp = self
                .opts
                .ocsp_response
                .clone()
                .unwrap_or_default();
            self.send_handshake(
                HandshakeType::CertificateStatus,
                HandshakePayload::CertificateStatus(CertificateStatus::new(ocsp)),
            );
        }

        if let Some(body) = self.server_key_exchange() {
            self.send_handshake(
                HandshakeType::ServerKeyExchange,
                HandshakePayload::ServerKeyExchange(ServerKeyExchangePayload(Payload::new(body))),
            );
        }

        if self.opts.request_client_cert {
            let sigschemes = match self.opts.version {
                ProtocolVersion::TLSv1_2 => Some(vec![
                    SignatureScheme::RSA_PKCS1_SHA256,
                    SignatureScheme::ECDSA_NISTP256_SHA256,
                ]),
                _ => None,
            };
            self.send_handshake(
                HandshakeType::CertificateRequest,
                HandshakePayload::CertificateRequest(CertificateRequestPayload {
                    certtypes: vec![
                        ClientCertificateType::RSASign,
                        ClientCertificateType::ECDSASign,
                    ],
                    sigschemes,
                    canames: Vec::new(),
                }),
            );
        }

        self.send_handshake(
            HandshakeType::ServerHelloDone,
            HandshakePayload::ServerHelloDone,
        );
    }

    fn server_key_exchange(&mut self) -> Option<Vec<u8>> {
        let suite = self.opts.suite;
        let secure_random = self.provider.secure_random;

        let mut params = Vec::new();
        if matches!(
            suite.kx,
            KeyExchangeAlgorithm::PSK
                | KeyExchangeAlgorithm::DHE_PSK
                | KeyExchangeAlgorithm::ECDHE_PSK
        ) {
            let hint = self.opts.psk_hint.clone();
            if suite.kx == KeyExchangeAlgorithm::PSK && hint.is_none() {
                return None;
            }
            PayloadU16::new(hint.unwrap_or_default()).encode(&mut params);
        }

        match suite.kx {
            KeyExchangeAlgorithm::ECDHE | KeyExchangeAlgorithm::ECDHE_PSK => {
                let offered = self
                    .client_hello
                    .as_ref()
                    .and_then(|hello| hello.namedgroups_extension())
                    .unwrap_or_default()
                    .to_vec();
                let group = self
                    .provider
                    .kx_groups
                    .iter()
                    .find(|group| offered.contains(&group.name()))
                    .copied()
                    .expect("no common group");
                let kx = group.start(secure_random).unwrap();
                ServerEcdhParams::new(group.name(), kx.pub_key()).encode(&mut params);
                self.kx = Some(kx);
            }
            KeyExchangeAlgorithm::DHE
            | KeyExchangeAlgorithm::DHE_PSK
            | KeyExchangeAlgorithm::DH_anon => {
                let p = unhex(FFDHE2048_P);
                let kx = self
                    .provider
                    .finite_field
                    .start(&p, &[2], secure_random)
                    .unwrap();
                ServerDhParams::new(&p, &[2], kx.pub_key()).encode(&mut params);
                self.kx = Some(kx);
            }
            KeyExchangeAlgorithm::PSK => {}
            KeyExchangeAlgorithm::RSA => return None,
            KeyExchangeAlgorithm::SRP => {
                let (username, password) = self.opts.srp.clone().expect("SRP suite without SRP");
                let state = SrpServerState::new(&username, &password);
                ServerSrpParams {
                    n: PayloadU16::new(state.n_bytes.clone()),
                    g: PayloadU16::new(vec![2]),
                    salt: PayloadU8::new(SRP_SALT.to_vec()),
                    b: PayloadU16::new(state.public.to_bytes_be()),
                }
                .encode(&mut params);
                self.srp = Some(state);
            }
            _ => unreachable!(),
        }

        if !suite.requires_server_cert() {
            return Some(params);
        }

        let mut signed = Vec::new();
        signed.extend_from_slice(&self.client_random);
        signed.extend_from_slice(&self.server_random);
        signed.extend_from_slice(&params);

        let key = self.signing_key();
        let mut body = params;
        match self.opts.version {
            ProtocolVersion::TLSv1_2 => {
                let signer = key
                    .choose_scheme(&[
                        SignatureScheme::RSA_PKCS1_SHA256,
                        SignatureScheme::ECDSA_NISTP256_SHA256,
                    ])
                    .unwrap();
                signer.scheme().encode(&mut body);
                PayloadU16::new(signer.sign(&signed).unwrap()).encode(&mut body);
            }
            _ => {
                let signer = key.legacy_signer().unwrap();
                PayloadU16::new(signer.sign(&signed).unwrap()).encode(&mut body);
            }
        }
        Some(body)
    }

    fn pre_master_secret(&mut self, body: &[u8]) -> Vec<u8> {
        let suite = self.opts.suite;
        let mut rd = Reader::init(body);

        let psk = match suite.kx {
            KeyExchangeAlgorithm::PSK
            | KeyExchangeAlgorithm::DHE_PSK
            | KeyExchangeAlgorithm::ECDHE_PSK => {
                let identity = PayloadU16::read(&mut rd).unwrap();
                let (expected, key) = self
                    .opts
                    .psk
                    .clone()
                    .expect("PSK suite without a PSK");
                assert_eq!(identity.0, expected);
                Some(key)
            }
            _ => None,
        };

        let other = match suite.kx {
            KeyExchangeAlgorithm::RSA => {
                let encrypted = PayloadU16::read(&mut rd).unwrap();
                let key = rsa::RsaPrivateKey::from_pkcs8_der(self.opts.key_type.key_der()).unwrap();
                key.decrypt(rsa::Pkcs1v15Encrypt, &encrypted.0)
                    .unwrap()
            }
            KeyExchangeAlgorithm::ECDHE | KeyExchangeAlgorithm::ECDHE_PSK => {
                let public = PayloadU8::read(&mut rd).unwrap();
                let kx = self.kx.take().unwrap();
                kx.complete(&public.0)
                    .unwrap()
                    .secret_bytes()
                    .to_vec()
            }
            KeyExchangeAlgorithm::DHE
            | KeyExchangeAlgorithm::DHE_PSK
            | KeyExchangeAlgorithm::DH_anon => {
                let public = PayloadU16::read(&mut rd).unwrap();
                let kx = self.kx.take().unwrap();
                let secret = kx.complete(&public.0).unwrap();
                let bytes = secret.secret_bytes();
                let start = bytes
                    .iter()
                    .position(|&b| b != 0)
                    .unwrap_or(bytes.len());
                bytes[start..].to_vec()
            }
            KeyExchangeAlgorithm::PSK => vec![0u8; psk.as_ref().map_or(0, |k| k.len())],
            KeyExchangeAlgorithm::SRP => {
                let public = PayloadU16::read(&mut rd).unwrap();
                self.srp
                    .take()
                    .unwrap()
                    .premaster(&public.0)
            }
            _ => unreachable!(),
        };
        assert!(!rd.any_left());

        match psk {
            None => other,
            Some(key) => {
                let mut pre_master = Vec::new();
                (other.len() as u16).encode(&mut pre_master);
                pre_master.extend_from_slice(&other);
                (key.len() as u16).encode(&mut pre_master);
                pre_master.extend_from_slice(&key);
                pre_master
            }
        }
    }

    fn derive_keys(&mut self, pre_master: &[u8]) {
        let mut seed = Vec::new();
        seed.extend_from_slice(&self.client_random);
        seed.extend_from_slice(&self.server_random);

        let mut master = [0u8; 48];
        self.prf(&mut master, pre_master, b"master secret", &seed);
        self.master_secret = Some(master);

        if !self.session_id.is_empty() {
            self.opts
                .cache
                .by_id
                .lock()
                .unwrap()
                .insert(self.session_id.as_ref().to_vec(), master);
        }
        self.make_cipher_pair(&master);
    }

    fn make_cipher_pair(&mut self, master: &[u8; 48]) {
        let alg = self.opts.suite.record_alg;
        let shape = alg.key_block_shape();

        let mut seed = Vec::new();
        seed.extend_from_slice(&self.server_random);
        seed.extend_from_slice(&self.client_random);
        let mut block = vec![0u8; shape.len()];
        self.prf(&mut block, master, b"key expansion", &seed);

        let (client_mac, rest) = block.split_at(shape.mac_key_len);
        let (server_mac, rest) = rest.split_at(shape.mac_key_len);
        let (client_key, rest) = rest.split_at(shape.enc_key_len);
        let (server_key, rest) = rest.split_at(shape.enc_key_len);
        let (client_iv, server_iv) = rest.split_at(shape.fixed_iv_len);

        self.pending_decrypter = Some(alg.decrypter(
            DirectionKeys {
                mac_key: client_mac,
                enc_key: client_key,
                iv: client_iv,
            },
            self.opts.version,
        ));
        self.pending_encrypter = Some(alg.encrypter(
            DirectionKeys {
                mac_key: server_mac,
                enc_key: server_key,
                iv: server_iv,
            },
            self.opts.version,
            self.provider.secure_random,
        ));
    }

    fn prf(&self, out: &mut [u8], secret: &[u8], label: &[u8], seed: &[u8]) {
        let suite = self.opts.suite;
        let prf = match self.opts.version {
            ProtocolVersion::TLSv1_2 => suite.prf_provider,
            _ => suite.legacy_prf_provider,
        };
        prf.for_secret(out, secret, label, seed);
    }

    fn transcript_hash(&self) -> Vec<u8> {
        let suite = self.opts.suite;
        let hash = match self.opts.version {
            ProtocolVersion::TLSv1_2 => suite.common.hash_provider,
            _ => suite.legacy_hash_provider,
        };
        hash.hash(&self.transcript).as_ref().to_vec()
    }

    fn verify_data(&self, label: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; 12];
        self.prf(
            &mut out,
            self.master_secret.as_ref().unwrap(),
            label,
            &self.transcript_hash(),
        );
        out
    }

    fn check_client_finished(&mut self, received: &[u8]) {
        self.client_verify_data = received.to_vec();
        assert_eq!(
            received,
            self.verify_data(b"client finished"),
            "client Finished did not verify"
        );
    }

    fn send_finished(&mut self) {
        let mut verify_data = self.verify_data(b"server finished");
        if self.opts.corrupt_finished {
            verify_data[0] ^= 0xff;
        }
        self.server_verify_data = verify_data.clone();
        self.send_handshake(
            HandshakeType::Finished,
            HandshakePayload::Finished(Payload::new(verify_data)),
        );
    }

    fn send_new_ticket(&mut self) {
        let ticket = match self.opts.empty_ticket {
            true => Vec::new(),
            false => {
                let mut issued = self.opts.cache.tickets_issued.lock().unwrap();
                *issued += 1;
                format!("ticket #{}", *issued).into_bytes()
            }
        };
        if !ticket.is_empty() {
            self.opts
                .cache
                .by_ticket
                .lock()
                .unwrap()
                .insert(ticket.clone(), self.master_secret.unwrap());
        }
        self.send_handshake(
            HandshakeType::NewSessionTicket,
            HandshakePayload::NewSessionTicket(NewSessionTicketPayload::new(
                self.opts.ticket_lifetime_hint,
                ticket,
            )),
        );
    }

    fn send_ccs(&mut self) {
        self.write_record(ContentType::ChangeCipherSpec, &[0x01]);
        self.encrypter = Some(
            self.pending_encrypter
                .take()
                .expect("ChangeCipherSpec before keys"),
        );
        self.write_seq = 0;
    }

    fn send_handshake(&mut self, typ: HandshakeType, payload: HandshakePayload) {
        let encoded = HandshakeMessagePayload { typ, payload }.get_encoding();
        if typ != HandshakeType::HelloRequest {
            self.transcript.extend_from_slice(&encoded);
        }
        self.write_record(ContentType::Handshake, &encoded);
    }

    pub fn write_record(&mut self, typ: ContentType, payload: &[u8]) {
        let version = self.opts.version;
        let opaque = match &mut self.encrypter {
            Some(encrypter) => {
                let msg = BorrowedPlainMessage {
                    typ,
                    version,
                    payload,
                };
                let opaque = encrypter
                    .encrypt(msg, self.write_seq)
                    .unwrap();
                self.write_seq += 1;
                opaque
            }
            None => OpaqueMessage {
                typ,
                version,
                payload: payload.to_vec(),
            },
        };
        self.outgoing.extend(opaque.encode());
    }

    pub fn send_app_data(&mut self, data: &[u8]) {
        assert!(self.handshake_complete);
        self.write_record(ContentType::ApplicationData, data);
    }

    pub fn send_alert(&mut self, level: AlertLevel, description: AlertDescription) {
        let alert = AlertMessagePayload { level, description }.get_encoding();
        self.write_record(ContentType::Alert, &alert);
    }

    pub fn send_close_notify(&mut self) {
        self.send_alert(AlertLevel::Warning, AlertDescription::CloseNotify);
    }

    pub fn send_hello_request(&mut self) {
        self.send_handshake(HandshakeType::HelloRequest, HandshakePayload::HelloRequest);
    }

    fn signing_key(&self) -> Arc<dyn SigningKey> {
        self.provider
            .key_provider
            .load_private_key(self.opts.key_type.key())
            .unwrap()
    }

    fn verifier(&self) -> WebPkiServerVerifier {
        WebPkiServerVerifier::new(root_store(), &self.provider)
    }

    fn client_leaf(&self) -> CertificateDer<'static> {
        self.client_certs
            .as_ref()
            .and_then(|certs| certs.first())
            .cloned()
            .expect("CertificateVerify without a certificate")
    }
}

/// The server half of RFC 5054 SRP-SHA1.
struct SrpServerState {
    n_bytes: Vec<u8>,
    n: BigUint,
    verifier: BigUint,
    secret: BigUint,
    public: BigUint,
}

impl SrpServerState {
    fn new(username: &[u8], password: &[u8]) -> Self {
        let n_bytes = unhex(SRP_1024_N);
        let n = BigUint::from_bytes_be(&n_bytes);
        let g = BigUint::from(2u32);

        let inner = sha1_of(&[username, b":", password]);
        let x = BigUint::from_bytes_be(&sha1_of(&[SRP_SALT, &inner]));
        let verifier = g.modpow(&x, &n);
        let k = BigUint::from_bytes_be(&sha1_of(&[&n_bytes, &pad(&g, n_bytes.len())]));
        let secret = BigUint::from_bytes_be(&[0x5a; 32]);
        let public = ((&k * &verifier) + g.modpow(&secret, &n)) % &n;

        Self {
            n_bytes,
            n,
            verifier,
            secret,
            public,
        }
    }

    /// S = (A * v^u) ^ b % N
    fn premaster(&self, client_public: &[u8]) -> Vec<u8> {
        let len = self.n_bytes.len();
        let a = BigUint::from_bytes_be(client_public);
        let u = BigUint::from_bytes_be(&sha1_of(&[&pad(&a, len), &pad(&self.public, len)]));
        ((&a * self.verifier.modpow(&u, &self.n)) % &self.n)
            .modpow(&self.secret, &self.n)
            .to_bytes_be()
    }
}

fn sha1_of(parts: &[&[u8]]) -> [u8; 20] {
    let mut ctx = Sha1::new();
    for p in parts {
        ctx.update(p);
    }
    ctx.finalize().into()
}

fn pad(v: &BigUint, len: usize) -> Vec<u8> {
    let bytes = v.to_bytes_be();
    let mut out = vec![0u8; len.saturating_sub(bytes.len())];
    out.extend_from_slice(&bytes);
    out
}

fn uses_ecc(suite: SupportedCipherSuite) -> bool {
    matches!(
        suite.kx,
        KeyExchangeAlgorithm::ECDHE | KeyExchangeAlgorithm::ECDHE_PSK
    ) || suite
        .sign
        .iter()
        .any(|scheme| *scheme == SignatureScheme::ECDSA_NISTP256_SHA256)
}

/// An in-memory transport between a client and a `ScriptedServer`.
///
/// Writes go straight to the server; reads come from whatever it has
/// queued.  Either direction can be made to block.
pub struct Pipe {
    pub server: ScriptedServer,
    pub block_reads: bool,
    pub block_writes: bool,
    /// Deliver at most this many bytes per read.
    pub read_chunk: Option<usize>,
    /// Report end-of-file once the server's bytes are used up.
    pub eof: bool,
}

impl Pipe {
    pub fn new(server: ScriptedServer) -> Self {
        Self {
            server,
            block_reads: false,
            block_writes: false,
            read_chunk: None,
            eof: false,
        }
    }

    pub fn with_options(opts: ServerOptions) -> Self {
        Self::new(ScriptedServer::new(opts))
    }
}

impl io::Read for Pipe {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.block_reads {
            return Err(io::ErrorKind::WouldBlock.into());
        }

        let available = &mut self.server.outgoing;
        if available.is_empty() {
            return match self.eof {
                true => Ok(0),
                false => Err(io::ErrorKind::WouldBlock.into()),
            };
        }

        let mut len = buf.len().min(available.len());
        if let Some(chunk) = self.read_chunk {
            len = len.min(chunk);
        }
        buf[..len].copy_from_slice(&available[..len]);
        available.drain(..len);
        Ok(len)
    }
}

impl io::Write for Pipe {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.block_writes {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        self.server.receive(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `connect` until it finishes, unblocking the pipe whenever it is
/// asked to wait.
pub fn do_handshake(client: &mut ClientConnection, pipe: &mut Pipe) -> Result<(), Error> {
    for _ in 0..16 {
        match client.connect(pipe)? {
            HandshakeStatus::Done => return Ok(()),
            HandshakeStatus::WantRead => {
                assert!(
                    pipe.block_reads || !pipe.server.outgoing.is_empty(),
                    "handshake stalled"
                );
                pipe.block_reads = false;
            }
            HandshakeStatus::WantWrite => pipe.block_writes = false,
        }
    }
    panic!("handshake did not finish");
}

/// Move everything the client has queued into the server.
pub fn flush_client(client: &mut ClientConnection, pipe: &mut Pipe) {
    while client.wants_write() {
        client.write_tls(pipe).unwrap();
    }
}

/// Move everything the server has queued into the client and process it.
pub fn deliver_to_client(client: &mut ClientConnection, pipe: &mut Pipe) -> Result<(), Error> {
    while !pipe.server.outgoing.is_empty() {
        client.read_tls(pipe).unwrap();
    }
    client.process_new_packets()
}
