use zeroize::Zeroizing;

use super::hmac;

/// An instantiation of the TLS PRF with a specific, implicit hash construction.
///
/// See the definitions in [RFC5246 section 5](https://www.rfc-editor.org/rfc/rfc5246#section-5)
/// for TLS 1.2, and [RFC2246 section 5](https://www.rfc-editor.org/rfc/rfc2246#section-5)
/// for the MD5/SHA-1 construction used by TLS 1.0 and 1.1.
///
/// See [`PrfUsingHmac`] and [`LegacyPrf`] as routes to implementing this
/// trait with just implementations of [`hmac::Hmac`].
pub trait Prf: Send + Sync {
    /// Computes `PRF(secret, label, seed)`, writing the result into `output`.
    ///
    /// The caller guarantees that `label` and `seed` are non-empty.
    fn for_secret(&self, output: &mut [u8], secret: &[u8], label: &[u8], seed: &[u8]);
}

/// Implements [`Prf`] for TLS 1.2 using a [`hmac::Hmac`].
pub struct PrfUsingHmac<'a>(pub &'a dyn hmac::Hmac);

impl Prf for PrfUsingHmac<'_> {
    fn for_secret(&self, output: &mut [u8], secret: &[u8], label: &[u8], seed: &[u8]) {
        p_hash(output, &*self.0.with_key(secret), label, seed);
    }
}

/// Implements the TLS 1.0/1.1 [`Prf`]: `P_MD5(S1, ..) XOR P_SHA1(S2, ..)`.
///
/// `S1` and `S2` are the first and second halves of the secret; when the
/// secret has odd length they share its middle byte.
pub struct LegacyPrf<'a> {
    /// HMAC-MD5.
    pub md5: &'a dyn hmac::Hmac,
    /// HMAC-SHA1.
    pub sha1: &'a dyn hmac::Hmac,
}

impl Prf for LegacyPrf<'_> {
    fn for_secret(&self, output: &mut [u8], secret: &[u8], label: &[u8], seed: &[u8]) {
        let half = (secret.len() + 1) / 2;
        let s1 = &secret[..half];
        let s2 = &secret[secret.len() - half..];

        p_hash(output, &*self.md5.with_key(s1), label, seed);

        let mut sha1_out = Zeroizing::new(vec![0u8; output.len()]);
        p_hash(&mut sha1_out, &*self.sha1.with_key(s2), label, seed);

        output
            .iter_mut()
            .zip(sha1_out.iter())
            .for_each(|(out, b)| *out ^= *b);
    }
}

/// `P_hash` from RFC5246 section 5, keyed by `hmac_key`.
#[doc(hidden)]
pub fn p_hash(out: &mut [u8], hmac_key: &dyn hmac::Key, label: &[u8], seed: &[u8]) {
    let mut previous_a: Option<hmac::Tag> = None;

    let chunk_size = hmac_key.tag_len();
    for chunk in out.chunks_mut(chunk_size) {
        let a_i = match previous_a {
            // A(0) = HMAC_hash(secret, label + seed)
            None => hmac_key.sign(&[label, seed]),
            // A(i) = HMAC_hash(secret, A(i - 1))
            Some(previous_a) => hmac_key.sign(&[previous_a.as_ref()]),
        };

        // P_hash[i] = HMAC_hash(secret, A(i) + label + seed)
        let p_term = hmac_key.sign(&[a_i.as_ref(), label, seed]);
        chunk.copy_from_slice(&p_term.as_ref()[..chunk.len()]);

        previous_a = Some(a_i);
    }
}
