use std::marker::PhantomData;

use hmac::digest::core_api::BlockSizeUser;
use hmac::{Mac, SimpleHmac};
use sha2::Digest;

use crate::crypto;

/// HMAC over any RustCrypto [`Digest`].
pub(crate) struct DigestHmac<D>(PhantomData<fn() -> D>);

pub(crate) static HMAC_MD5: DigestHmac<md5::Md5> = DigestHmac(PhantomData);
pub(crate) static HMAC_SHA1: DigestHmac<sha1::Sha1> = DigestHmac(PhantomData);
pub(crate) static HMAC_SHA256: DigestHmac<sha2::Sha256> = DigestHmac(PhantomData);

impl<D> crypto::hmac::Hmac for DigestHmac<D>
where
    D: Digest + BlockSizeUser + Clone + Send + Sync + 'static,
{
    fn with_key(&self, key: &[u8]) -> Box<dyn crypto::hmac::Key> {
        Box::new(DigestHmacKey(
            SimpleHmac::<D>::new_from_slice(key).expect("HMAC accepts keys of any length"),
        ))
    }

    fn hash_output_len(&self) -> usize {
        <D as Digest>::output_size()
    }
}

struct DigestHmacKey<D: Digest + BlockSizeUser>(SimpleHmac<D>);

impl<D> crypto::hmac::Key for DigestHmacKey<D>
where
    D: Digest + BlockSizeUser + Clone + Send + Sync + 'static,
{
    fn sign_concat(&self, first: &[u8], middle: &[&[u8]], last: &[u8]) -> crypto::hmac::Tag {
        let mut ctx = self.0.clone();
        ctx.update(first);
        for m in middle {
            ctx.update(m);
        }
        ctx.update(last);
        crypto::hmac::Tag::new(&ctx.finalize().into_bytes()[..])
    }

    fn tag_len(&self) -> usize {
        <D as Digest>::output_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hmac::Hmac;

    #[test]
    fn rfc4231_case_2() {
        let key = HMAC_SHA256.with_key(b"Jefe");
        let tag = key.sign(&[b"what do ya want ", b"for nothing?"]);
        assert_eq!(
            tag.as_ref(),
            &[
                0x5b, 0xdc, 0xc1, 0x46, 0xbf, 0x60, 0x75, 0x4e, 0x6a, 0x04, 0x24, 0x26, 0x08, 0x95,
                0x75, 0xc7, 0x5a, 0x00, 0x3f, 0x08, 0x9d, 0x27, 0x39, 0x83, 0x9d, 0xec, 0x58, 0xb9,
                0x64, 0xec, 0x38, 0x43,
            ]
        );
        assert_eq!(key.tag_len(), 32);
    }

    #[test]
    fn tag_lengths_follow_digest() {
        assert_eq!(HMAC_MD5.hash_output_len(), 16);
        assert_eq!(HMAC_SHA1.with_key(&[]).tag_len(), 20);
    }
}
