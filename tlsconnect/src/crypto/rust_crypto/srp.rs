use rsa::BigUint;
use sha1::{Digest, Sha1};
use zeroize::Zeroizing;

use crate::crypto::{self, SecureRandom, SrpExchange, SrpInputs};
use crate::error::{Error, PeerMisbehaved};
use crate::rand;

/// Length of the client's secret exponent `a`.
const SECRET_LEN: usize = 32;

/// The client side of RFC 5054 SRP, with SHA-1.
#[derive(Debug)]
pub struct SrpSha1;

impl crypto::SrpClient for SrpSha1 {
    fn exchange(
        &self,
        inputs: &SrpInputs<'_>,
        secure_random: &dyn SecureRandom,
    ) -> Result<SrpExchange, Error> {
        let n = BigUint::from_bytes_be(inputs.n);
        let g = BigUint::from_bytes_be(inputs.g);
        let b = BigUint::from_bytes_be(inputs.server_public) % &n;
        if b == BigUint::from(0u32) {
            return Err(PeerMisbehaved::InvalidSrpPublicValue.into());
        }

        let a_random = Zeroizing::new(rand::random_vec(secure_random, SECRET_LEN)?);
        let a = BigUint::from_bytes_be(&a_random);
        let client_public = g.modpow(&a, &n);

        let n_len = inputs.n.len();
        let u = BigUint::from_bytes_be(&sha1_of(&[
            &pad(&client_public, n_len),
            &pad(&b, n_len),
        ]));
        if u == BigUint::from(0u32) {
            return Err(PeerMisbehaved::InvalidSrpPublicValue.into());
        }

        let k = BigUint::from_bytes_be(&sha1_of(&[inputs.n, &pad(&g, n_len)]));
        let inner = sha1_of(&[inputs.identity, b":", inputs.password]);
        let x = BigUint::from_bytes_be(&sha1_of(&[inputs.salt, &inner]));

        // S = (B - k * g^x) ^ (a + u * x) % N
        let kgx = (&k * g.modpow(&x, &n)) % &n;
        let base = ((&b + &n) - kgx) % &n;
        let exponent = &a + &u * &x;
        let premaster = Zeroizing::new(base.modpow(&exponent, &n).to_bytes_be());

        Ok(SrpExchange {
            client_public: client_public.to_bytes_be(),
            premaster: crypto::SharedSecret::from(&premaster[..]),
        })
    }
}

fn sha1_of(parts: &[&[u8]]) -> [u8; 20] {
    let mut ctx = Sha1::new();
    for p in parts {
        ctx.update(p);
    }
    ctx.finalize().into()
}

/// Left-pad `v` with zeros to `len` bytes.
fn pad(v: &BigUint, len: usize) -> Vec<u8> {
    let bytes = v.to_bytes_be();
    let mut out = vec![0u8; len.saturating_sub(bytes.len())];
    out.extend_from_slice(&bytes);
    out
}
