use zeroize::Zeroizing;

use super::{bit_length, missing_params, take_secret, ClientKxContext, KeyExchangeStrategy};
use crate::crypto::FiniteFieldDh as FiniteFieldProvider;
use crate::error::{Error, PeerIncompatible};
#[cfg(feature = "logging")]
use crate::log::{debug, warn};
use crate::msgs::base::PayloadU16;
use crate::msgs::codec::{Codec, Reader};
use crate::msgs::handshake::{KeyExchangeAlgorithm, ServerDhParams};

/// The smallest prime we accept from a server.
const MIN_PRIME_BITS: usize = 1024;

/// Ephemeral finite-field Diffie-Hellman in the server's group.
///
/// Used alone for DHE and DH_anon, and inside DHE_PSK.
pub(super) struct FiniteFieldDh {
    kx: KeyExchangeAlgorithm,
    provider: &'static dyn FiniteFieldProvider,
    params: Option<ServerDhParams>,
    shared: Option<Zeroizing<Vec<u8>>>,
}

impl FiniteFieldDh {
    pub(super) fn new(kx: KeyExchangeAlgorithm, provider: &'static dyn FiniteFieldProvider) -> Self {
        Self {
            kx,
            provider,
            params: None,
            shared: None,
        }
    }
}

impl KeyExchangeStrategy for FiniteFieldDh {
    fn algorithm(&self) -> KeyExchangeAlgorithm {
        self.kx
    }

    fn parse_server_params(&mut self, r: &mut Reader<'_>) -> Result<(), Error> {
        let params = ServerDhParams::read(r)?;

        let bits = bit_length(&params.dh_p.0);
        if bits < MIN_PRIME_BITS {
            warn!("Server DH prime is only {} bits", bits);
            return Err(PeerIncompatible::DhPrimeTooSmall.into());
        }
        debug!("Server DH group is {} bits", bits);

        self.params = Some(params);
        Ok(())
    }

    fn compute_client_key_exchange_message(
        &mut self,
        cx: &ClientKxContext<'_>,
    ) -> Result<Vec<u8>, Error> {
        let params = self
            .params
            .as_ref()
            .ok_or_else(|| missing_params("ServerDHParams"))?;

        let kx = self
            .provider
            .start(&params.dh_p.0, &params.dh_g.0, cx.secure_random)?;
        let ours = PayloadU16::new(kx.pub_key().to_vec());

        let mut secret = kx.complete(&params.dh_Ys.0)?;
        secret.strip_leading_zeros();
        self.shared = Some(Zeroizing::new(secret.secret_bytes().to_vec()));

        Ok(ours.get_encoding())
    }

    fn derive_pre_master_secret(&mut self) -> Result<Zeroizing<Vec<u8>>, Error> {
        take_secret(&mut self.shared)
    }
}
