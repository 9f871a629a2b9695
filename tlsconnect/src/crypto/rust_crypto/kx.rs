use p256::elliptic_curve::sec1::ToEncodedPoint;

use super::RandAdapter;
use crate::crypto::{self, SecureRandom, SupportedKxGroup};
use crate::error::{Error, PeerMisbehaved};
use crate::msgs::enums::NamedGroup;

/// Every supported elliptic-curve group, in preference order.
pub static ALL_KX_GROUPS: &[&dyn SupportedKxGroup] = &[&X25519, &SECP256R1];

/// Key exchange using X25519.
#[derive(Debug)]
pub struct X25519;

impl SupportedKxGroup for X25519 {
    fn start(
        &self,
        secure_random: &dyn SecureRandom,
    ) -> Result<Box<dyn crypto::ActiveKeyExchange>, Error> {
        let mut rng = RandAdapter::new(secure_random);
        let priv_key = x25519_dalek::EphemeralSecret::random_from_rng(&mut rng);
        rng.check()?;

        Ok(Box::new(X25519KeyExchange {
            pub_key: (&priv_key).into(),
            priv_key,
        }))
    }

    fn name(&self) -> NamedGroup {
        NamedGroup::X25519
    }
}

struct X25519KeyExchange {
    priv_key: x25519_dalek::EphemeralSecret,
    pub_key: x25519_dalek::PublicKey,
}

impl crypto::ActiveKeyExchange for X25519KeyExchange {
    fn complete(self: Box<Self>, peer: &[u8]) -> Result<crypto::SharedSecret, Error> {
        let peer_array: [u8; 32] = peer
            .try_into()
            .map_err(|_| Error::from(PeerMisbehaved::InvalidKeyShare))?;
        let their_pub = x25519_dalek::PublicKey::from(peer_array);
        let shared_secret = self.priv_key.diffie_hellman(&their_pub);
        if !shared_secret.was_contributory() {
            return Err(PeerMisbehaved::InvalidKeyShare.into());
        }
        Ok(crypto::SharedSecret::from(&shared_secret.as_bytes()[..]))
    }

    fn pub_key(&self) -> &[u8] {
        self.pub_key.as_bytes()
    }

    fn group(&self) -> Option<NamedGroup> {
        Some(NamedGroup::X25519)
    }
}

/// Key exchange using NIST P-256, with uncompressed points.
#[derive(Debug)]
pub struct SECP256R1;

impl SupportedKxGroup for SECP256R1 {
    fn start(
        &self,
        secure_random: &dyn SecureRandom,
    ) -> Result<Box<dyn crypto::ActiveKeyExchange>, Error> {
        let mut rng = RandAdapter::new(secure_random);
        let priv_key = p256::ecdh::EphemeralSecret::random(&mut rng);
        rng.check()?;

        let pub_key = priv_key
            .public_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec();
        Ok(Box::new(P256KeyExchange { priv_key, pub_key }))
    }

    fn name(&self) -> NamedGroup {
        NamedGroup::secp256r1
    }
}

struct P256KeyExchange {
    priv_key: p256::ecdh::EphemeralSecret,
    pub_key: Vec<u8>,
}

impl crypto::ActiveKeyExchange for P256KeyExchange {
    fn complete(self: Box<Self>, peer: &[u8]) -> Result<crypto::SharedSecret, Error> {
        let their_pub = p256::PublicKey::from_sec1_bytes(peer)
            .map_err(|_| Error::from(PeerMisbehaved::InvalidKeyShare))?;
        let shared = self.priv_key.diffie_hellman(&their_pub);
        Ok(crypto::SharedSecret::from(
            &shared.raw_secret_bytes()[..],
        ))
    }

    fn pub_key(&self) -> &[u8] {
        &self.pub_key
    }

    fn group(&self) -> Option<NamedGroup> {
        Some(NamedGroup::secp256r1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::rust_crypto::test_provider::FixedRandom;

    #[test]
    fn x25519_agrees() {
        let a = X25519.start(&FixedRandom(1)).unwrap();
        let b = X25519.start(&FixedRandom(2)).unwrap();
        let b_pub = b.pub_key().to_vec();
        let a_pub = a.pub_key().to_vec();
        assert_eq!(a_pub.len(), 32);
        let s1 = a.complete(&b_pub).unwrap();
        let s2 = b.complete(&a_pub).unwrap();
        assert_eq!(s1.secret_bytes(), s2.secret_bytes());
    }

    #[test]
    fn p256_agrees_and_uses_uncompressed_points() {
        let a = SECP256R1.start(&FixedRandom(3)).unwrap();
        let b = SECP256R1.start(&FixedRandom(4)).unwrap();
        assert_eq!(a.pub_key().len(), 65);
        assert_eq!(a.pub_key()[0], 0x04);
        let b_pub = b.pub_key().to_vec();
        let a_pub = a.pub_key().to_vec();
        assert_eq!(
            a.complete(&b_pub).unwrap().secret_bytes(),
            b.complete(&a_pub).unwrap().secret_bytes()
        );
    }

    #[test]
    fn bad_peer_points_are_rejected() {
        let a = X25519.start(&FixedRandom(5)).unwrap();
        assert_eq!(
            a.complete(&[0u8; 31]).err(),
            Some(PeerMisbehaved::InvalidKeyShare.into())
        );
        let a = X25519.start(&FixedRandom(5)).unwrap();
        assert_eq!(
            a.complete(&[0u8; 32]).err(),
            Some(PeerMisbehaved::InvalidKeyShare.into())
        );
        let a = SECP256R1.start(&FixedRandom(6)).unwrap();
        assert_eq!(
            a.complete(&[0x04, 1, 2, 3]).err(),
            Some(PeerMisbehaved::InvalidKeyShare.into())
        );
    }

    #[test]
    fn random_failure_is_reported() {
        assert_eq!(
            X25519.start(&crate::crypto::rust_crypto::test_provider::FailingRandom).err(),
            Some(Error::FailedToGetRandomBytes)
        );
    }
}
