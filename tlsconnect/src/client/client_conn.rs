use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use std::{fmt, io, mem};

use pki_types::{CertificateDer, ServerName, UnixTime};

use super::handy::{ClientSessionMemoryCache, NoClientSessionStorage};
use super::hs;
use super::state::{self, ClientContext, HandshakeObserver, HandshakeState, State};
use crate::builder::{ConfigBuilder, WantsVersions};
use crate::conn::CommonState;
use crate::crypto::signer::CertifiedKey;
use crate::crypto::{rust_crypto, CryptoProvider};
use crate::enums::{AlertDescription, HandshakeType, ProtocolVersion, SignatureScheme};
use crate::error::{ApiMisuse, Error};
use crate::key_log::KeyLog;
use crate::kx::{ResolvesPskIdentity, SrpCredentials};
#[cfg(feature = "logging")]
use crate::log::{debug, trace};
use crate::msgs::deframer::MessageDeframer;
use crate::msgs::hsjoiner::HandshakeJoiner;
use crate::msgs::message::{Message, MessagePayload};
use crate::session::{Session, VerifyResult};
use crate::suites::SupportedCipherSuite;
use crate::time_provider::{DefaultTimeProvider, TimeProvider};
use crate::verify::{self, VerifyMode};
use crate::versions;

/// Handshake messages larger than this are refused unless configured
/// otherwise.  Certificate chains are the largest messages we receive.
pub(super) const DEFAULT_MAX_CERTIFICATE_LIST_SIZE: usize = 100 * 1024;

/// How long, in seconds, a session without a ticket lifetime hint stays
/// resumable.
pub(super) const DEFAULT_SESSION_TIMEOUT: u64 = 7200;

/// A trait for the ability to store client session data, so that sessions
/// can be resumed in future connections.
///
/// Generally all data in this interface should be treated as
/// **highly sensitive**, containing enough key material to break all security
/// of the corresponding session.
///
/// `insert` and `remove` are mutating operations; this isn't expressed
/// in the type system to allow implementations freedom in
/// how to achieve interior mutability.  `Mutex` is a common
/// choice.
pub trait ClientSessionStore: fmt::Debug + Send + Sync {
    /// The session most recently stored for `server_name`, if any.
    ///
    /// Expired sessions may be returned: the caller checks the expiry.
    fn lookup(&self, server_name: &ServerName<'static>) -> Option<Session>;

    /// Remember `value` for `server_name`, replacing any earlier session.
    ///
    /// Returns `true` if another server's session was evicted to make room.
    fn insert(&self, server_name: ServerName<'static>, value: Session) -> bool;

    /// Forget any session for `server_name`.
    fn remove(&self, server_name: &ServerName<'static>);
}

/// A trait for the ability to choose a certificate chain and
/// private key for the purposes of client authentication.
pub trait ResolvesClientCert: fmt::Debug + Send + Sync {
    /// Resolve a client certificate chain/private key to use as the client's
    /// identity.
    ///
    /// `acceptable_issuers` is undecoded and unverified by the crate, and
    /// lists the DER-encoded distinguished names the server will accept as
    /// issuers.  It may be empty.
    ///
    /// `sigschemes` is the list of the [`SignatureScheme`]s the server
    /// supports.  It is empty below TLS 1.2, where the key type fixes the
    /// signature.
    ///
    /// Return `None` to continue the handshake without any client
    /// authentication.  The server may reject the handshake later
    /// if it requires authentication.
    fn resolve(
        &self,
        acceptable_issuers: &[&[u8]],
        sigschemes: &[SignatureScheme],
    ) -> Option<Arc<CertifiedKey>>;

    /// Return true if any certificates at all are available.
    fn has_certs(&self) -> bool;
}

/// Session cache statistics, shared by every connection made with a config.
#[derive(Debug, Default)]
pub struct SessionStats {
    connect: AtomicU64,
    connect_good: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    timeouts: AtomicU64,
    cache_full: AtomicU64,
}

impl SessionStats {
    /// Handshakes started.
    pub fn connect(&self) -> u64 {
        self.connect.load(Ordering::Relaxed)
    }

    /// Handshakes completed.
    pub fn connect_good(&self) -> u64 {
        self.connect_good.load(Ordering::Relaxed)
    }

    /// Handshakes that resumed a cached session.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Handshakes that did not resume, whether or not a session was offered.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Cached sessions found to have expired.
    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    /// Sessions evicted from the cache to make room.
    pub fn cache_full(&self) -> u64 {
        self.cache_full.load(Ordering::Relaxed)
    }

    pub(super) fn count_connect(&self) {
        self.connect.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn count_connect_good(&self) {
        self.connect_good.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn count_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn count_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn count_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub(super) fn count_cache_full(&self) {
        self.cache_full.fetch_add(1, Ordering::Relaxed);
    }
}

/// Configuration for how/when a client is allowed to resume a previous session.
#[derive(Clone, Debug)]
pub struct Resumption {
    /// How we store session data or tickets. The default is to use an in-memory
    /// [`ClientSessionMemoryCache`].
    pub(super) store: Arc<dyn ClientSessionStore>,

    /// Whether to ask for, and offer, RFC 5077 session tickets.
    pub(super) tickets: bool,

    pub(super) stats: Arc<SessionStats>,
}

impl Resumption {
    /// Create a new `Resumption` that stores data for the given number of sessions in memory.
    ///
    /// This is the default `Resumption` choice, and enables resuming a session with
    /// a session id or RFC 5077 ticket.
    pub fn in_memory_sessions(num: usize) -> Self {
        Self::store(Arc::new(ClientSessionMemoryCache::new(num)))
    }

    /// Use a custom [`ClientSessionStore`] implementation to store sessions.
    ///
    /// By default, enables resuming a session with a session id or RFC 5077 ticket.
    pub fn store(store: Arc<dyn ClientSessionStore>) -> Self {
        Self {
            store,
            tickets: true,
            stats: Arc::new(SessionStats::default()),
        }
    }

    /// Disable all use of session resumption.
    pub fn disabled() -> Self {
        Self {
            store: Arc::new(NoClientSessionStorage),
            tickets: false,
            stats: Arc::new(SessionStats::default()),
        }
    }

    /// Configure whether session tickets are requested and offered.
    ///
    /// Without tickets, sessions resume by session id only.
    pub fn tickets(mut self, enabled: bool) -> Self {
        self.tickets = enabled;
        self
    }

    /// The statistics of the session cache.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }
}

impl Default for Resumption {
    /// Create an in-memory session store resumption with up to 256 server names,
    /// allowing a session to resume with a session id or RFC 5077 ticket.
    fn default() -> Self {
        Self::in_memory_sessions(256)
    }
}

/// Common configuration for (typically) all connections made by a program.
///
/// Making one of these is cheap, though one of the inputs may be expensive: gathering trust roots
/// from the operating system to add to the [`RootCertStore`] passed to `with_root_certificates()`
/// (the rustls-native-certs crate is often used for this) may take on the order of a few hundred
/// milliseconds.
///
/// These must be created via the [`ClientConfig::builder()`] or [`ClientConfig::builder_with_provider()`]
/// function.
///
/// # Defaults
///
/// * [`ClientConfig::max_fragment_size`]: the default is `None` (meaning 16kB).
/// * [`ClientConfig::resumption`]: supports resumption with up to 256 server names, using session
///   ids or tickets.
/// * [`ClientConfig::enable_sni`]: true
/// * [`ClientConfig::verify_mode`]: [`VerifyMode::Strict`]
/// * [`ClientConfig::ocsp_stapling`]: false
/// * [`ClientConfig::max_certificate_list_size`]: 100kB
/// * [`ClientConfig::session_timeout`]: two hours
/// * [`ClientConfig::key_log`]: key material is not logged.
/// * [`ClientConfig::psk`] and [`ClientConfig::srp`]: none, so PSK and SRP suites are not offered.
///
/// [`RootCertStore`]: crate::RootCertStore
#[derive(Clone)]
pub struct ClientConfig {
    /// Source of all cryptography.
    pub provider: Arc<CryptoProvider>,

    /// How and when the client can resume a previous session.
    pub resumption: Resumption,

    /// Whether to send the Server Name Indication (SNI) extension
    /// during the client handshake.
    ///
    /// The default is true.
    pub enable_sni: bool,

    /// What to do when the server certificate chain does not verify.
    pub verify_mode: VerifyMode,

    /// Whether to ask the server to staple an OCSP response.
    ///
    /// A verifier that asks for one itself gets one either way.
    pub ocsp_stapling: bool,

    /// The maximum size of plaintext input to be emitted in a single TLS record.
    /// A value of None is equivalent to the [TLS maximum] of 16 kB.
    ///
    /// The value must be between 32 and 16389 bytes; it counts the record
    /// header.  Out of range values are reported as errors from
    /// [`ClientConnection::new`].
    ///
    /// [TLS maximum]: https://datatracker.ietf.org/doc/html/rfc8446#section-5.1
    pub max_fragment_size: Option<usize>,

    /// The largest handshake message the server may send.
    pub max_certificate_list_size: usize,

    /// How long sessions stay resumable when the server gives no ticket
    /// lifetime hint.
    pub session_timeout: Duration,

    /// How to output key material for debugging.  The default
    /// does nothing.
    pub key_log: Arc<dyn KeyLog>,

    /// Where to find the pre-shared key for PSK cipher suites.
    pub psk: Option<Arc<dyn ResolvesPskIdentity>>,

    /// The user name and password for SRP cipher suites.
    pub srp: Option<SrpCredentials>,

    /// Told about handshake progress, for diagnostics.
    pub observer: Option<Arc<dyn HandshakeObserver>>,

    /// Provides the current system time
    pub time_provider: Arc<dyn TimeProvider>,

    /// How to decide what client auth certificate/keys to use.
    pub client_auth_cert_resolver: Arc<dyn ResolvesClientCert>,

    /// Supported versions.
    pub(super) versions: versions::EnabledVersions,

    /// How to verify the server certificate chain.
    pub(super) verifier: Arc<dyn verify::ServerCertVerifier>,
}

impl ClientConfig {
    /// Create a builder for a client configuration with the default
    /// [`CryptoProvider`]: [`rust_crypto::default_provider`].
    ///
    /// For more information, see the [`ConfigBuilder`] documentation.
    pub fn builder() -> ConfigBuilder<Self, WantsVersions> {
        Self::builder_with_provider(Arc::new(rust_crypto::default_provider()))
    }

    /// Create a builder for a client configuration with a specific [`CryptoProvider`].
    ///
    /// This will use the provider's configured ciphersuites.  You must additionally choose
    /// which protocol versions to enable, using `with_protocol_versions` or
    /// `with_safe_default_protocol_versions` and handling the `Result` in case a protocol
    /// version is not supported by the provider's ciphersuites.
    ///
    /// For more information, see the [`ConfigBuilder`] documentation.
    pub fn builder_with_provider(
        provider: Arc<CryptoProvider>,
    ) -> ConfigBuilder<Self, WantsVersions> {
        ConfigBuilder {
            state: WantsVersions(()),
            provider,
            time_provider: Arc::new(DefaultTimeProvider),
            side: PhantomData,
        }
    }

    /// Access configuration options whose use is dangerous and requires
    /// extra care.
    pub fn dangerous(&mut self) -> danger::DangerousClientConfig<'_> {
        danger::DangerousClientConfig { cfg: self }
    }

    pub(super) fn current_time(&self) -> Result<UnixTime, Error> {
        self.time_provider
            .current_time()
            .ok_or(Error::FailedToGetCurrentTime)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("provider", &self.provider)
            .field("resumption", &self.resumption)
            .field("enable_sni", &self.enable_sni)
            .field("verify_mode", &self.verify_mode)
            .field("ocsp_stapling", &self.ocsp_stapling)
            .field("max_fragment_size", &self.max_fragment_size)
            .field("max_certificate_list_size", &self.max_certificate_list_size)
            .field("session_timeout", &self.session_timeout)
            .field("versions", &self.versions)
            .field("verifier", &self.verifier)
            .finish_non_exhaustive()
    }
}

/// Container for unsafe APIs
pub(super) mod danger {
    use std::sync::Arc;

    use super::ClientConfig;
    use crate::verify::ServerCertVerifier;

    /// Accessor for dangerous configuration options.
    #[derive(Debug)]
    pub struct DangerousClientConfig<'a> {
        /// The underlying ClientConfig
        pub cfg: &'a mut ClientConfig,
    }

    impl DangerousClientConfig<'_> {
        /// Overrides the default `ServerCertVerifier` with something else.
        pub fn set_certificate_verifier(&mut self, verifier: Arc<dyn ServerCertVerifier>) {
            self.cfg.verifier = verifier;
        }
    }
}

/// How far [`ClientConnection::connect`] got.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeStatus {
    /// The handshake is complete and all our handshake bytes were written.
    Done,
    /// The transport had no more bytes for us.  Call `connect` again once
    /// it is readable.
    WantRead,
    /// The transport would not take all our bytes.  Call `connect` again
    /// once it is writable.
    WantWrite,
}

/// What the handshake learns about the peer, for the connection to report.
#[derive(Debug, Default)]
pub(crate) struct ClientConnectionData {
    pub(crate) resumed: bool,
    pub(crate) secure_renegotiation: bool,
    pub(crate) verify_result: Option<VerifyResult>,
    pub(crate) peer_certificates: Option<Vec<CertificateDer<'static>>>,
    /// A cached session was offered in the ClientHello, and should be
    /// forgotten if this handshake fails.
    pub(crate) offered_session: bool,
    pub(crate) session: Option<Session>,
}

/// This represents a single TLS client connection.
///
/// The handshake is driven with [`ClientConnection::connect`] over any
/// `Read + Write` transport, blocking or not.  Afterwards, application data
/// goes through [`ClientConnection::send_application_data`] and
/// [`ClientConnection::read_application_data`], with the caller moving
/// bytes using [`ClientConnection::write_tls`], [`ClientConnection::read_tls`]
/// and [`ClientConnection::process_new_packets`].
pub struct ClientConnection {
    config: Arc<ClientConfig>,
    server_name: ServerName<'static>,
    common: CommonState,
    data: ClientConnectionData,
    state: Result<Box<dyn State>, Error>,
    message_deframer: MessageDeframer,
    handshake_joiner: HandshakeJoiner,
    /// Set while a `connect` call is on the stack.
    in_progress: bool,
}

impl ClientConnection {
    /// Make a new ClientConnection.  `config` controls how
    /// we behave in the TLS protocol, `server_name` is the
    /// name of the server we want to talk to.
    ///
    /// The ClientHello is queued immediately; the first `connect` sends it.
    pub fn new(config: Arc<ClientConfig>, server_name: ServerName<'static>) -> Result<Self, Error> {
        let mut common = CommonState::new(config.max_fragment_size, config.observer.clone())?;
        let mut data = ClientConnectionData::default();

        let state = {
            let mut cx = ClientContext {
                common: &mut common,
                data: &mut data,
            };
            hs::start_handshake(config.clone(), server_name.clone(), &mut cx)?
        };

        Ok(Self {
            handshake_joiner: HandshakeJoiner::new(config.max_certificate_list_size),
            config,
            server_name,
            common,
            data,
            state: Ok(state),
            message_deframer: MessageDeframer::default(),
            in_progress: false,
        })
    }

    /// Drive the handshake as far as the transport allows.
    ///
    /// Queued bytes are written before anything is read.  A transport
    /// reporting `WouldBlock` suspends the handshake, and this returns
    /// [`HandshakeStatus::WantRead`] or [`HandshakeStatus::WantWrite`];
    /// call again with the same connection to carry on.
    ///
    /// Any other failure is final: a fatal alert is written if possible,
    /// and every later call returns the same error.
    pub fn connect<T>(&mut self, io: &mut T) -> Result<HandshakeStatus, Error>
    where
        T: io::Read + io::Write,
    {
        if self.in_progress {
            return Err(ApiMisuse::ReentrantHandshake.into());
        }

        self.in_progress = true;
        let result = self.drive(io);
        self.in_progress = false;
        result
    }

    fn drive<T>(&mut self, io: &mut T) -> Result<HandshakeStatus, Error>
    where
        T: io::Read + io::Write,
    {
        if let Err(e) = &self.state {
            return Err(e.clone());
        }

        loop {
            while self.common.wants_write() {
                match self.common.write_tls(io) {
                    Ok(0) => return Err(self.fail(Error::Transport(io::ErrorKind::WriteZero))),
                    Ok(_) => {}
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                        return Ok(HandshakeStatus::WantWrite)
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => return Err(self.fail(Error::Transport(e.kind()))),
                }
            }

            if !self.common.is_handshaking() {
                return Ok(HandshakeStatus::Done);
            }

            match self.read_tls(io) {
                Ok(0) => {
                    self.common.has_seen_eof = true;
                    return Err(self.fail(Error::Transport(io::ErrorKind::UnexpectedEof)));
                }
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(HandshakeStatus::WantRead)
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.fail(Error::Transport(e.kind()))),
            }

            if let Err(e) = self.process_new_packets() {
                // Try to write the alert describing the error, but don't
                // let a transport failure replace the primary error.
                let _ignored = self.common.write_tls(io);
                return Err(e);
            }
        }
    }

    /// Read TLS content from `rd` into the internal buffer.
    ///
    /// Call [`ClientConnection::process_new_packets`] afterwards to act
    /// on what was read.
    pub fn read_tls(&mut self, rd: &mut dyn io::Read) -> io::Result<usize> {
        self.message_deframer.read(rd)
    }

    /// Writes TLS messages to `wr`.
    ///
    /// A partial write leaves the rest queued for the next call.
    pub fn write_tls(&mut self, wr: &mut dyn io::Write) -> io::Result<usize> {
        self.common.write_tls(wr)
    }

    /// Returns true if the caller should call [`ClientConnection::write_tls`]
    /// as soon as possible.
    pub fn wants_write(&self) -> bool {
        self.common.wants_write()
    }

    /// Processes any new packets read by a previous call to
    /// [`ClientConnection::read_tls`].
    ///
    /// Errors from this function relate to TLS protocol errors, and
    /// are fatal to the connection.  Future calls after an error will do
    /// no new work and will return the same error.  A fatal alert is
    /// queued for sending.
    pub fn process_new_packets(&mut self) -> Result<(), Error> {
        let mut state = match mem::replace(&mut self.state, Err(Error::HandshakeNotComplete)) {
            Ok(state) => state,
            Err(e) => {
                self.state = Err(e.clone());
                return Err(e);
            }
        };

        loop {
            let msg = match self.next_message() {
                Ok(Some(msg)) => msg,
                Ok(None) => break,
                Err(e) => return Err(self.fail(e)),
            };

            state = match self.process_msg(state, msg) {
                Ok(state) => state,
                Err(e) => return Err(self.fail(e)),
            };
        }

        self.state = Ok(state);
        Ok(())
    }

    /// The next complete message, decrypted, with handshake messages
    /// reassembled.
    fn next_message(&mut self) -> Result<Option<Message>, Error> {
        loop {
            let version = self
                .common
                .negotiated_version
                .unwrap_or(ProtocolVersion::TLSv1_2);
            if let Some(msg) = self.handshake_joiner.pop(version)? {
                return Ok(Some(msg));
            }

            let opaque = match self.message_deframer.pop()? {
                Some(opaque) => opaque,
                None => return Ok(None),
            };

            let plain = self
                .common
                .record_layer
                .decrypt_incoming(opaque)?;

            if self.handshake_joiner.want_message(&plain) {
                self.handshake_joiner.take_message(plain)?;
                continue;
            }

            self.common.aligned_handshake = self.handshake_joiner.is_empty();
            return Ok(Some(Message::try_from(plain)?));
        }
    }

    fn process_msg(&mut self, state: Box<dyn State>, msg: Message) -> Result<Box<dyn State>, Error> {
        if let MessagePayload::Alert(alert) = &msg.payload {
            self.common.process_alert(alert)?;
            return Ok(state);
        }

        if msg.is_handshake_type(HandshakeType::HelloRequest) {
            if self.common.is_handshaking() {
                trace!("Ignoring HelloRequest during handshake");
            } else {
                self.common
                    .send_warning_alert(AlertDescription::NoRenegotiation);
            }
            return Ok(state);
        }

        let mut cx = ClientContext {
            common: &mut self.common,
            data: &mut self.data,
        };
        state::drive(state, &mut cx, msg)
    }

    /// Send the alert for `err`, forget any session this handshake put at
    /// risk, and poison the connection.
    fn fail(&mut self, err: Error) -> Error {
        if let Ok(desc) = AlertDescription::try_from(&err) {
            self.common.send_fatal_alert(desc);
        }

        if mem::take(&mut self.data.offered_session) {
            debug!("Forgetting cached session for {:?}", self.server_name);
            self.config
                .resumption
                .store
                .remove(&self.server_name);
        }

        self.state = Err(err.clone());
        err
    }

    /// Encrypt and queue `data` for sending.
    ///
    /// Fails with [`ApiMisuse::DataBeforeHandshake`] until the handshake
    /// is complete.
    pub fn send_application_data(&mut self, data: &[u8]) -> Result<(), Error> {
        if let Err(e) = &self.state {
            return Err(e.clone());
        }
        if self.common.is_handshaking() {
            return Err(ApiMisuse::DataBeforeHandshake.into());
        }
        self.common.send_appdata(data)
    }

    /// Read decrypted application data received from the server.
    ///
    /// This returns `WouldBlock` when no data is buffered, `Ok(0)` once the
    /// server has sent `close_notify`, and `UnexpectedEof` if the
    /// transport closed without one.
    pub fn read_application_data(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.common.read_plaintext(buf)
    }

    /// Queues a close_notify warning alert to be sent in the next
    /// [`ClientConnection::write_tls`] call.  This informs the peer that the
    /// connection is being closed.
    pub fn send_close_notify(&mut self) {
        self.common.send_close_notify();
    }

    /// Note that the transport reached end-of-file.
    pub fn note_eof(&mut self) {
        self.common.has_seen_eof = true;
    }

    /// Returns true if the connection is currently performing the TLS
    /// handshake.
    pub fn is_handshaking(&self) -> bool {
        self.common.is_handshaking()
    }

    /// The handshake step the connection is at.
    pub fn handshake_state(&self) -> HandshakeState {
        self.common.handshake_state()
    }

    /// Whether this connection resumed a cached session.
    pub fn is_resumed(&self) -> bool {
        self.data.resumed
    }

    /// Whether the server signalled support for secure renegotiation.
    pub fn secure_renegotiation(&self) -> bool {
        self.data.secure_renegotiation
    }

    /// Retrieves the ciphersuite agreed with the peer.
    ///
    /// This returns None until the ciphersuite is agreed.
    pub fn negotiated_cipher_suite(&self) -> Option<SupportedCipherSuite> {
        self.common.suite
    }

    /// Retrieves the protocol version agreed with the peer.
    ///
    /// This returns `None` until the version is agreed.
    pub fn protocol_version(&self) -> Option<ProtocolVersion> {
        self.common.negotiated_version
    }

    /// The certificate chain the server presented, or that of the
    /// resumed session.
    pub fn peer_certificates(&self) -> Option<&[CertificateDer<'static>]> {
        self.data.peer_certificates.as_deref()
    }

    /// The outcome of server certificate verification.
    pub fn verify_result(&self) -> Option<&VerifyResult> {
        self.data.verify_result.as_ref()
    }

    /// The session established by a completed handshake.
    pub fn session(&self) -> Option<&Session> {
        self.data.session.as_ref()
    }

    /// The name this connection was made for.
    pub fn server_name(&self) -> &ServerName<'static> {
        &self.server_name
    }
}

impl fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConnection")
            .field("server_name", &self.server_name)
            .field("handshake_state", &self.common.handshake_state())
            .finish()
    }
}
