use std::fmt;
use std::sync::Arc;

use zeroize::Zeroizing;

use super::{take_secret, ClientKxContext, KeyExchangeStrategy, ServerKeyExchangeUse};
use crate::error::{Error, PeerIncompatible};
#[cfg(feature = "logging")]
use crate::log::{debug, trace};
use crate::msgs::base::PayloadU16;
use crate::msgs::codec::{Codec, Reader};
use crate::msgs::handshake::KeyExchangeAlgorithm;

/// A pre-shared key and the identity the server knows it by.
#[derive(Clone)]
pub struct PskIdentity {
    /// Sent to the server in the clear.
    pub identity: Vec<u8>,
    /// The key itself.
    pub key: Zeroizing<Vec<u8>>,
}

impl PskIdentity {
    /// Make a new `PskIdentity`.
    pub fn new(identity: impl Into<Vec<u8>>, key: impl Into<Vec<u8>>) -> Self {
        Self {
            identity: identity.into(),
            key: Zeroizing::new(key.into()),
        }
    }
}

impl fmt::Debug for PskIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PskIdentity")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Chooses the PSK identity to use for a server.
pub trait ResolvesPskIdentity: fmt::Debug + Send + Sync {
    /// Return the identity and key to use, given the server's identity
    /// hint if it sent one.
    ///
    /// Returning `None` aborts the handshake.
    fn resolve(&self, hint: Option<&[u8]>) -> Option<PskIdentity>;
}

/// Always answers with the same identity, whatever the hint.
#[derive(Debug)]
pub struct StaticPskIdentity(PskIdentity);

impl StaticPskIdentity {
    /// Make a resolver that always returns `psk`.
    pub fn new(psk: PskIdentity) -> Self {
        Self(psk)
    }
}

impl ResolvesPskIdentity for StaticPskIdentity {
    fn resolve(&self, _hint: Option<&[u8]>) -> Option<PskIdentity> {
        Some(self.0.clone())
    }
}

/// PSK key exchange, optionally mixed with an ephemeral
/// (EC)DH exchange (RFC 4279, RFC 5489).
pub(super) struct PreSharedKey {
    kx: KeyExchangeAlgorithm,
    resolver: Arc<dyn ResolvesPskIdentity>,
    inner: Option<Box<dyn KeyExchangeStrategy>>,
    hint: Option<Vec<u8>>,
    pre_master: Option<Zeroizing<Vec<u8>>>,
}

impl PreSharedKey {
    pub(super) fn new(
        kx: KeyExchangeAlgorithm,
        resolver: Arc<dyn ResolvesPskIdentity>,
        inner: Option<Box<dyn KeyExchangeStrategy>>,
    ) -> Self {
        Self {
            kx,
            resolver,
            inner,
            hint: None,
            pre_master: None,
        }
    }
}

impl KeyExchangeStrategy for PreSharedKey {
    fn algorithm(&self) -> KeyExchangeAlgorithm {
        self.kx
    }

    fn server_key_exchange(&self) -> ServerKeyExchangeUse {
        match self.inner {
            Some(_) => ServerKeyExchangeUse::Required,
            None => ServerKeyExchangeUse::Optional,
        }
    }

    fn parse_server_params(&mut self, r: &mut Reader<'_>) -> Result<(), Error> {
        let hint = PayloadU16::read(r)?;
        if !hint.0.is_empty() {
            trace!("PSK identity hint {:?}", hint.0);
            self.hint = Some(hint.0);
        }

        match &mut self.inner {
            Some(inner) => inner.parse_server_params(r),
            None => Ok(()),
        }
    }

    fn compute_client_key_exchange_message(
        &mut self,
        cx: &ClientKxContext<'_>,
    ) -> Result<Vec<u8>, Error> {
        let psk = self
            .resolver
            .resolve(self.hint.as_deref())
            .filter(|psk| !psk.key.is_empty())
            .ok_or(PeerIncompatible::NoPskIdentityAvailable)?;
        debug!("Using PSK identity {:?}", psk.identity);
        u16_len(&psk.identity, "PSK identity")?;
        let key_len = u16_len(&psk.key, "PSK")?;

        let mut msg = PayloadU16::new(psk.identity.clone()).get_encoding();
        let other = match &mut self.inner {
            Some(inner) => {
                msg.extend(inner.compute_client_key_exchange_message(cx)?);
                inner.derive_pre_master_secret()?
            }
            None => Zeroizing::new(vec![0u8; psk.key.len()]),
        };

        // u16(len(other)) || other || u16(len(psk)) || psk
        let mut pre_master = Zeroizing::new(Vec::with_capacity(4 + other.len() + psk.key.len()));
        u16_len(&other, "premaster")?.encode(&mut pre_master);
        pre_master.extend_from_slice(&other);
        key_len.encode(&mut pre_master);
        pre_master.extend_from_slice(&psk.key);
        self.pre_master = Some(pre_master);

        Ok(msg)
    }

    fn derive_pre_master_secret(&mut self) -> Result<Zeroizing<Vec<u8>>, Error> {
        take_secret(&mut self.pre_master)
    }
}

fn u16_len(bytes: &[u8], what: &str) -> Result<u16, Error> {
    u16::try_from(bytes.len())
        .map_err(|_| Error::General(format!("{what} longer than 65535 bytes")))
}
