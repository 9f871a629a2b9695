use std::fmt;
use std::sync::{Arc, Mutex};

use pki_types::{CertificateDer, PrivateKeyDer, ServerName};

use crate::client;
use crate::crypto::signer::{CertifiedKey, SigningKey};
use crate::crypto::KeyProvider;
use crate::enums::SignatureScheme;
use crate::error::Error;
use crate::limited_cache;
#[cfg(feature = "logging")]
use crate::log::warn;
use crate::session::Session;

/// An implementer of `ClientSessionStore` which does nothing.
#[derive(Debug)]
pub(super) struct NoClientSessionStorage;

impl client::ClientSessionStore for NoClientSessionStorage {
    fn lookup(&self, _: &ServerName<'static>) -> Option<Session> {
        None
    }

    fn insert(&self, _: ServerName<'static>, _: Session) -> bool {
        false
    }

    fn remove(&self, _: &ServerName<'static>) {}
}

/// An implementer of `ClientSessionStore` that stores everything
/// in memory.
///
/// It keeps one session per server name, and enforces a limit on the
/// number of servers to bound memory usage: the server inserted longest
/// ago is forgotten first.
pub struct ClientSessionMemoryCache {
    servers: Mutex<limited_cache::LimitedCache<ServerName<'static>, Session>>,
}

impl ClientSessionMemoryCache {
    /// Make a new ClientSessionMemoryCache.  `size` is the
    /// maximum number of stored sessions.
    pub fn new(size: usize) -> Self {
        Self {
            servers: Mutex::new(limited_cache::LimitedCache::new(size)),
        }
    }

    /// The number of cached sessions.
    pub fn len(&self) -> usize {
        self.servers
            .lock()
            .map(|servers| servers.len())
            .unwrap_or_default()
    }

    /// Whether no sessions are cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl client::ClientSessionStore for ClientSessionMemoryCache {
    fn lookup(&self, server_name: &ServerName<'static>) -> Option<Session> {
        match self.servers.lock() {
            Ok(servers) => servers.get(server_name).cloned(),
            Err(_) => {
                warn!("Session cache lock poisoned; not resuming");
                None
            }
        }
    }

    fn insert(&self, server_name: ServerName<'static>, value: Session) -> bool {
        match self.servers.lock() {
            Ok(mut servers) => servers.insert(server_name, value),
            Err(_) => {
                warn!("Session cache lock poisoned; not caching");
                false
            }
        }
    }

    fn remove(&self, server_name: &ServerName<'static>) {
        if let Ok(mut servers) = self.servers.lock() {
            servers.remove(server_name);
        }
    }
}

impl fmt::Debug for ClientSessionMemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Note: we omit self.servers as it may contain sensitive data.
        f.debug_struct("ClientSessionMemoryCache")
            .finish()
    }
}

#[derive(Debug)]
pub(super) struct FailResolveClientCert {}

impl client::ResolvesClientCert for FailResolveClientCert {
    fn resolve(
        &self,
        _acceptable_issuers: &[&[u8]],
        _sigschemes: &[SignatureScheme],
    ) -> Option<Arc<CertifiedKey>> {
        None
    }

    fn has_certs(&self) -> bool {
        false
    }
}

/// Always offers the same certificate, whatever the server asks for.
#[derive(Debug)]
pub(super) struct AlwaysResolvesClientCert(Arc<CertifiedKey>);

impl AlwaysResolvesClientCert {
    pub(super) fn new(
        key_provider: &dyn KeyProvider,
        chain: Vec<CertificateDer<'static>>,
        private_key: PrivateKeyDer<'static>,
    ) -> Result<Self, Error> {
        if chain.is_empty() {
            return Err(Error::General("client certificate chain is empty".into()));
        }

        let key: Arc<dyn SigningKey> = key_provider.load_private_key(private_key)?;
        Ok(Self(Arc::new(CertifiedKey::new(chain, key))))
    }
}

impl client::ResolvesClientCert for AlwaysResolvesClientCert {
    fn resolve(
        &self,
        _acceptable_issuers: &[&[u8]],
        _sigschemes: &[SignatureScheme],
    ) -> Option<Arc<CertifiedKey>> {
        Some(Arc::clone(&self.0))
    }

    fn has_certs(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pki_types::UnixTime;

    use super::*;
    use crate::client::ClientSessionStore;
    use crate::crypto::rust_crypto::TLS_RSA_WITH_AES_128_CBC_SHA;
    use crate::enums::ProtocolVersion;
    use crate::msgs::handshake::SessionId;
    use crate::session::VerifyResult;

    fn session(id: u8) -> Session {
        Session::new(
            SessionId::new(&[id; 32]),
            &[id; 48],
            TLS_RSA_WITH_AES_128_CBC_SHA,
            ProtocolVersion::TLSv1_2,
            Vec::new(),
            VerifyResult::NoCertificate,
            None,
            UnixTime::since_unix_epoch(Duration::from_secs(1_000)),
            Duration::from_secs(7200),
        )
    }

    fn name(s: &'static str) -> ServerName<'static> {
        ServerName::try_from(s).unwrap()
    }

    #[test]
    fn test_noclientsessionstorage_does_nothing() {
        let c = NoClientSessionStorage {};
        assert!(!c.insert(name("example.com"), session(1)));
        assert!(c.lookup(&name("example.com")).is_none());
        c.remove(&name("example.com"));
    }

    #[test]
    fn one_session_per_server() {
        let c = ClientSessionMemoryCache::new(4);
        c.insert(name("example.com"), session(1));
        c.insert(name("example.com"), session(2));
        assert_eq!(c.len(), 1);
        assert_eq!(
            c.lookup(&name("example.com")).unwrap().id(),
            &[2; 32]
        );
    }

    #[test]
    fn oldest_server_is_evicted() {
        let c = ClientSessionMemoryCache::new(2);
        assert!(!c.insert(name("a.example"), session(1)));
        assert!(!c.insert(name("b.example"), session(2)));
        assert!(c.insert(name("c.example"), session(3)));

        assert!(c.lookup(&name("a.example")).is_none());
        assert!(c.lookup(&name("b.example")).is_some());
        assert!(c.lookup(&name("c.example")).is_some());
    }

    #[test]
    fn remove_forgets_server() {
        let c = ClientSessionMemoryCache::new(2);
        c.insert(name("a.example"), session(1));
        c.remove(&name("a.example"));
        assert!(c.is_empty());
    }

    #[test]
    fn debug_hides_sessions() {
        let c = ClientSessionMemoryCache::new(2);
        c.insert(name("a.example"), session(1));
        assert_eq!(format!("{:?}", c), "ClientSessionMemoryCache");
    }

    #[test]
    fn fail_resolver_never_answers() {
        let r = FailResolveClientCert {};
        assert!(!client::ResolvesClientCert::has_certs(&r));
        assert!(client::ResolvesClientCert::resolve(&r, &[], &[]).is_none());
    }
}
