use zeroize::Zeroizing;

use super::{missing_params, take_secret, ClientKxContext, KeyExchangeStrategy};
use crate::crypto::SupportedKxGroup;
use crate::error::{Error, PeerMisbehaved};
#[cfg(feature = "logging")]
use crate::log::debug;
use crate::msgs::base::PayloadU8;
use crate::msgs::codec::{Codec, Reader};
use crate::msgs::handshake::{KeyExchangeAlgorithm, ServerEcdhParams};

/// Ephemeral elliptic-curve Diffie-Hellman on a named group we offered.
///
/// Used alone for ECDHE and inside ECDHE_PSK.
pub(super) struct EphemeralEcdh {
    kx: KeyExchangeAlgorithm,
    offered: Vec<&'static dyn SupportedKxGroup>,
    server: Option<(&'static dyn SupportedKxGroup, PayloadU8)>,
    shared: Option<Zeroizing<Vec<u8>>>,
}

impl EphemeralEcdh {
    pub(super) fn new(kx: KeyExchangeAlgorithm, offered: Vec<&'static dyn SupportedKxGroup>) -> Self {
        Self {
            kx,
            offered,
            server: None,
            shared: None,
        }
    }
}

impl KeyExchangeStrategy for EphemeralEcdh {
    fn algorithm(&self) -> KeyExchangeAlgorithm {
        self.kx
    }

    fn parse_server_params(&mut self, r: &mut Reader<'_>) -> Result<(), Error> {
        let params = ServerEcdhParams::read(r)?;
        let name = params.curve_params.named_group;

        let group = self
            .offered
            .iter()
            .find(|group| group.name() == name)
            .copied()
            .ok_or(PeerMisbehaved::SelectedUnofferedKxGroup)?;
        debug!("ECDHE curve is {:?}", name);

        self.server = Some((group, params.public));
        Ok(())
    }

    fn compute_client_key_exchange_message(
        &mut self,
        cx: &ClientKxContext<'_>,
    ) -> Result<Vec<u8>, Error> {
        let (group, server_public) = self
            .server
            .as_ref()
            .ok_or_else(|| missing_params("ServerECDHParams"))?;

        let kx = group.start(cx.secure_random)?;
        let ours = PayloadU8::new(kx.pub_key().to_vec());
        let secret = kx.complete(&server_public.0)?;
        self.shared = Some(Zeroizing::new(secret.secret_bytes().to_vec()));

        Ok(ours.get_encoding())
    }

    fn derive_pre_master_secret(&mut self) -> Result<Zeroizing<Vec<u8>>, Error> {
        take_secret(&mut self.shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::rust_crypto::kx::{ALL_KX_GROUPS, SECP256R1, X25519};
    use crate::crypto::rust_crypto::test_provider::FixedRandom;
    use crate::enums::ProtocolVersion;
    use crate::error::InvalidMessage;
    use crate::msgs::enums::NamedGroup;

    static RANDOM: FixedRandom = FixedRandom(0x44);

    fn context() -> ClientKxContext<'static> {
        ClientKxContext {
            client_version: ProtocolVersion::TLSv1_2,
            server_cert: None,
            secure_random: &RANDOM,
        }
    }

    #[test]
    fn x25519_agreement() {
        let server = X25519.start(&FixedRandom(0x99)).unwrap();
        let params = ServerEcdhParams::new(NamedGroup::X25519, server.pub_key()).get_encoding();

        let mut kx = EphemeralEcdh::new(KeyExchangeAlgorithm::ECDHE, ALL_KX_GROUPS.to_vec());
        kx.parse_server_params(&mut Reader::init(&params))
            .unwrap();
        let msg = kx
            .compute_client_key_exchange_message(&context())
            .unwrap();
        assert_eq!(msg[0] as usize, msg.len() - 1);

        let expected = server.complete(&msg[1..]).unwrap();
        assert_eq!(
            &kx.derive_pre_master_secret().unwrap()[..],
            expected.secret_bytes()
        );
    }

    #[test]
    fn unoffered_group_is_refused() {
        let params = ServerEcdhParams::new(NamedGroup::secp384r1, &[4; 97]).get_encoding();
        let mut kx = EphemeralEcdh::new(KeyExchangeAlgorithm::ECDHE, vec![&X25519 as &dyn SupportedKxGroup]);
        assert_eq!(
            kx.parse_server_params(&mut Reader::init(&params)),
            Err(PeerMisbehaved::SelectedUnofferedKxGroup.into())
        );
    }

    #[test]
    fn explicit_curves_are_refused() {
        // explicit_prime curve type
        let params = [0x01, 0x00, 0x17, 0x01, 0x04];
        let mut kx = EphemeralEcdh::new(KeyExchangeAlgorithm::ECDHE, vec![&SECP256R1 as &dyn SupportedKxGroup]);
        assert_eq!(
            kx.parse_server_params(&mut Reader::init(&params)),
            Err(InvalidMessage::UnsupportedCurveType.into())
        );
    }
}
