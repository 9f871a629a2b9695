use zeroize::Zeroizing;

use super::{take_secret, ClientKxContext, KeyExchangeStrategy, ServerKeyExchangeUse};
use crate::crypto::KeyTransport;
use crate::error::{Error, InvalidMessage};
use crate::msgs::base::PayloadU16;
use crate::msgs::codec::{Codec, Reader};
use crate::msgs::handshake::KeyExchangeAlgorithm;
use crate::rand;

/// RSA key transport: the client picks the pre-master secret and
/// encrypts it to the server certificate key.
pub(super) struct RsaKeyTransport {
    transport: &'static dyn KeyTransport,
    pre_master: Option<Zeroizing<Vec<u8>>>,
}

impl RsaKeyTransport {
    pub(super) fn new(transport: &'static dyn KeyTransport) -> Self {
        Self {
            transport,
            pre_master: None,
        }
    }
}

impl KeyExchangeStrategy for RsaKeyTransport {
    fn algorithm(&self) -> KeyExchangeAlgorithm {
        KeyExchangeAlgorithm::RSA
    }

    fn server_key_exchange(&self) -> ServerKeyExchangeUse {
        ServerKeyExchangeUse::Forbidden
    }

    fn parse_server_params(&mut self, _r: &mut Reader<'_>) -> Result<(), Error> {
        Err(InvalidMessage::UnexpectedMessage("ServerKeyExchange with RSA key transport").into())
    }

    fn compute_client_key_exchange_message(
        &mut self,
        cx: &ClientKxContext<'_>,
    ) -> Result<Vec<u8>, Error> {
        let server_cert = cx
            .server_cert
            .ok_or(Error::NoCertificatesPresented)?;

        // client_version || 46 random bytes
        let mut pre_master = Zeroizing::new(Vec::with_capacity(48));
        cx.client_version
            .encode(&mut pre_master);
        pre_master.extend_from_slice(&*Zeroizing::new(rand::random_vec(cx.secure_random, 46)?));

        let encrypted = self
            .transport
            .encrypt_pre_master(server_cert, &pre_master, cx.secure_random)?;
        self.pre_master = Some(pre_master);

        Ok(PayloadU16::new(encrypted).get_encoding())
    }

    fn derive_pre_master_secret(&mut self) -> Result<Zeroizing<Vec<u8>>, Error> {
        take_secret(&mut self.pre_master)
    }
}

#[cfg(test)]
mod tests {
    use pki_types::CertificateDer;

    use super::*;
    use crate::crypto::rust_crypto::test_provider::FixedRandom;
    use crate::crypto::SecureRandom;
    use crate::enums::ProtocolVersion;

    #[derive(Debug)]
    struct Identity;

    impl KeyTransport for Identity {
        fn encrypt_pre_master(
            &self,
            _end_entity: &CertificateDer<'_>,
            pre_master: &[u8],
            _secure_random: &dyn SecureRandom,
        ) -> Result<Vec<u8>, Error> {
            Ok(pre_master.iter().rev().copied().collect())
        }
    }

    static RANDOM: FixedRandom = FixedRandom(0x5a);

    #[test]
    fn pre_master_carries_offered_version() {
        let cert = CertificateDer::from(vec![0x30]);
        let mut kx = RsaKeyTransport::new(&Identity);
        let msg = kx
            .compute_client_key_exchange_message(&ClientKxContext {
                client_version: ProtocolVersion::TLSv1_1,
                server_cert: Some(&cert),
                secure_random: &RANDOM,
            })
            .unwrap();

        assert_eq!(&msg[..2], &[0x00, 48]);
        let pre_master = kx.derive_pre_master_secret().unwrap();
        assert_eq!(pre_master.len(), 48);
        assert_eq!(&pre_master[..2], &[0x03, 0x02]);
        assert!(pre_master[2..].iter().all(|&b| b == 0x5a));
    }

    #[test]
    fn needs_a_certificate() {
        let mut kx = RsaKeyTransport::new(&Identity);
        let err = kx
            .compute_client_key_exchange_message(&ClientKxContext {
                client_version: ProtocolVersion::TLSv1_2,
                server_cert: None,
                secure_random: &RANDOM,
            })
            .unwrap_err();
        assert_eq!(err, Error::NoCertificatesPresented);
        assert!(kx.derive_pre_master_secret().is_err());
    }

    #[test]
    fn server_params_are_refused() {
        let mut kx = RsaKeyTransport::new(&Identity);
        assert_eq!(kx.server_key_exchange(), ServerKeyExchangeUse::Forbidden);
        assert!(kx
            .parse_server_params(&mut Reader::init(&[]))
            .is_err());
    }
}
