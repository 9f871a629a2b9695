use rsa::BigUint;
use zeroize::Zeroizing;

use crate::crypto::{self, SecureRandom};
use crate::error::{Error, PeerIncompatible, PeerMisbehaved};
use crate::msgs::enums::NamedGroup;
use crate::rand;

/// Finite-field Diffie-Hellman over server-chosen groups.
#[derive(Debug)]
pub struct FiniteField;

impl crypto::FiniteFieldDh for FiniteField {
    fn start(
        &self,
        p: &[u8],
        g: &[u8],
        secure_random: &dyn SecureRandom,
    ) -> Result<Box<dyn crypto::ActiveKeyExchange>, Error> {
        let prime = BigUint::from_bytes_be(p);
        let generator = BigUint::from_bytes_be(g);
        if prime <= BigUint::from(3u32) {
            return Err(PeerIncompatible::DhPrimeTooSmall.into());
        }
        let p_minus_one = &prime - BigUint::from(1u32);
        if !in_open_range(&generator, &p_minus_one) {
            return Err(PeerMisbehaved::InvalidKeyShare.into());
        }

        // private exponent in [1, p-2]
        let x_random = Zeroizing::new(rand::random_vec(secure_random, p.len())?);
        let x = BigUint::from_bytes_be(&x_random) % (&p_minus_one - BigUint::from(1u32))
            + BigUint::from(1u32);
        let pub_key = generator
            .modpow(&x, &prime)
            .to_bytes_be();

        Ok(Box::new(FfdheKeyExchange {
            prime,
            p_len: p.len(),
            x: Zeroizing::new(x.to_bytes_be()),
            pub_key,
        }))
    }
}

/// Is `v` within `[2, p-2]`, given `p-1`?
fn in_open_range(v: &BigUint, p_minus_one: &BigUint) -> bool {
    *v > BigUint::from(1u32) && v < p_minus_one
}

struct FfdheKeyExchange {
    prime: BigUint,
    p_len: usize,
    x: Zeroizing<Vec<u8>>,
    pub_key: Vec<u8>,
}

impl crypto::ActiveKeyExchange for FfdheKeyExchange {
    fn complete(self: Box<Self>, peer_pub_key: &[u8]) -> Result<crypto::SharedSecret, Error> {
        let peer = BigUint::from_bytes_be(peer_pub_key);
        let p_minus_one = &self.prime - BigUint::from(1u32);
        if !in_open_range(&peer, &p_minus_one) {
            return Err(PeerMisbehaved::InvalidKeyShare.into());
        }

        let x = BigUint::from_bytes_be(&self.x);
        let shared = peer.modpow(&x, &self.prime).to_bytes_be();

        // left-pad to the length of p; callers strip the zeros
        let mut out = vec![0u8; self.p_len.saturating_sub(shared.len())];
        out.extend_from_slice(&shared);
        Ok(crypto::SharedSecret::from(out))
    }

    fn pub_key(&self) -> &[u8] {
        &self.pub_key
    }

    fn group(&self) -> Option<NamedGroup> {
        None
    }
}
