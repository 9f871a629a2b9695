use std::fmt;
use std::time::Duration;

use pki_types::{CertificateDer, UnixTime};
use zeroize::Zeroizing;

use crate::enums::ProtocolVersion;
use crate::error::Error;
use crate::msgs::enums::Compression;
use crate::msgs::handshake::SessionId;
use crate::suites::SupportedCipherSuite;

/// The outcome of checking the server's certificate chain.
#[derive(Clone, Debug, PartialEq)]
pub enum VerifyResult {
    /// The chain was verified.
    Verified,
    /// The cipher suite does not authenticate the server with a certificate.
    NoCertificate,
    /// Verification failed, and the handshake went on regardless
    /// because [`VerifyMode::Permissive`](crate::VerifyMode::Permissive)
    /// was configured.
    Failed(Error),
}

/// Everything needed to resume a TLS 1.0-1.2 session.
///
/// Sessions are created by a completed full handshake, stored in a
/// [`ClientSessionStore`](crate::client::ClientSessionStore) under the
/// server's name, and offered again in later ClientHellos.
#[derive(Clone)]
pub struct Session {
    id: SessionId,
    master_secret: Zeroizing<[u8; 48]>,
    suite: SupportedCipherSuite,
    version: ProtocolVersion,
    compression: Compression,
    server_cert_chain: Vec<CertificateDer<'static>>,
    verify_result: VerifyResult,
    ticket: Option<Vec<u8>>,
    ticket_lifetime_hint: u32,
    creation_time: UnixTime,
    lifetime: Duration,
}

impl Session {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: SessionId,
        master_secret: &[u8; 48],
        suite: SupportedCipherSuite,
        version: ProtocolVersion,
        server_cert_chain: Vec<CertificateDer<'static>>,
        verify_result: VerifyResult,
        ticket: Option<(Vec<u8>, u32)>,
        creation_time: UnixTime,
        session_timeout: Duration,
    ) -> Self {
        let (ticket, ticket_lifetime_hint) = match ticket {
            Some((ticket, hint)) => (Some(ticket), hint),
            None => (None, 0),
        };

        // a server-provided hint overrides our own timeout
        let lifetime = match ticket_lifetime_hint {
            0 => session_timeout,
            hint => Duration::from_secs(u64::from(hint)),
        };

        Self {
            id,
            master_secret: Zeroizing::new(*master_secret),
            suite,
            version,
            compression: Compression::Null,
            server_cert_chain,
            verify_result,
            ticket,
            ticket_lifetime_hint,
            creation_time,
            lifetime,
        }
    }

    /// The session identifier offered in a ClientHello to resume this session.
    ///
    /// For ticket sessions this is derived from the ticket.
    pub fn id(&self) -> &[u8] {
        self.id.as_ref()
    }

    pub(crate) fn session_id(&self) -> SessionId {
        self.id
    }

    pub(crate) fn master_secret(&self) -> &[u8; 48] {
        &self.master_secret
    }

    /// The negotiated cipher suite.
    pub fn suite(&self) -> SupportedCipherSuite {
        self.suite
    }

    /// The negotiated protocol version.
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// The negotiated compression method, which is always null.
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// The server's certificate chain, as presented during the full handshake.
    pub fn server_cert_chain(&self) -> &[CertificateDer<'static>] {
        &self.server_cert_chain
    }

    /// What became of certificate verification during the full handshake.
    pub fn verify_result(&self) -> &VerifyResult {
        &self.verify_result
    }

    /// The opaque ticket issued by the server, if any.
    pub fn ticket(&self) -> Option<&[u8]> {
        self.ticket.as_deref()
    }

    /// The server's hint for the ticket lifetime, in seconds.  Zero if
    /// there is no ticket or the server gave no hint.
    pub fn ticket_lifetime_hint(&self) -> u32 {
        self.ticket_lifetime_hint
    }

    /// When the full handshake completed.
    pub fn creation_time(&self) -> UnixTime {
        self.creation_time
    }

    /// How long after creation this session may be offered.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Whether this session is too old to offer at `now`.
    pub fn has_expired(&self, now: UnixTime) -> bool {
        let age = now
            .as_secs()
            .saturating_sub(self.creation_time.as_secs());
        Duration::from_secs(age) >= self.lifetime
    }

    /// A copy of this session carrying a fresh ticket.
    ///
    /// Used when a server re-issues a ticket while resuming.
    pub(crate) fn with_ticket(
        &self,
        id: SessionId,
        ticket: Vec<u8>,
        lifetime_hint: u32,
        now: UnixTime,
        session_timeout: Duration,
    ) -> Self {
        Self::new(
            id,
            &self.master_secret,
            self.suite,
            self.version,
            self.server_cert_chain.clone(),
            self.verify_result.clone(),
            Some((ticket, lifetime_hint)),
            now,
            session_timeout,
        )
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("suite", &self.suite)
            .field("version", &self.version)
            .field("verify_result", &self.verify_result)
            .field("ticket_lifetime_hint", &self.ticket_lifetime_hint)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::rust_crypto::TLS_RSA_WITH_AES_128_CBC_SHA;

    fn session(ticket: Option<(Vec<u8>, u32)>) -> Session {
        Session::new(
            SessionId::new(&[1; 32]),
            &[0x11; 48],
            TLS_RSA_WITH_AES_128_CBC_SHA,
            ProtocolVersion::TLSv1_2,
            Vec::new(),
            VerifyResult::Verified,
            ticket,
            UnixTime::since_unix_epoch(Duration::from_secs(1_000)),
            Duration::from_secs(7200),
        )
    }

    fn at(secs: u64) -> UnixTime {
        UnixTime::since_unix_epoch(Duration::from_secs(secs))
    }

    #[test]
    fn lifetime_defaults_to_timeout() {
        let s = session(None);
        assert_eq!(s.lifetime(), Duration::from_secs(7200));
        assert!(!s.has_expired(at(1_000 + 7199)));
        assert!(s.has_expired(at(1_000 + 7200)));
    }

    #[test]
    fn ticket_hint_overrides_timeout() {
        let s = session(Some((vec![1, 2, 3], 60)));
        assert_eq!(s.lifetime(), Duration::from_secs(60));
        assert_eq!(s.ticket(), Some(&[1u8, 2, 3][..]));
        assert!(s.has_expired(at(1_060)));
    }

    #[test]
    fn zero_hint_means_no_hint() {
        let s = session(Some((vec![9], 0)));
        assert_eq!(s.lifetime(), Duration::from_secs(7200));
    }

    #[test]
    fn clock_going_backwards_does_not_expire() {
        assert!(!session(None).has_expired(at(10)));
    }

    #[test]
    fn debug_omits_master_secret() {
        let s = session(None);
        assert!(!format!("{:?}", s).contains("17, 17"));
        assert_eq!(s.compression(), Compression::Null);
    }
}
