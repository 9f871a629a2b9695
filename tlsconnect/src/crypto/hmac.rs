use zeroize::Zeroize;

/// HMAC over one hash function.
///
/// The PRFs and the CBC record MAC are built on these: HMAC-MD5 and
/// HMAC-SHA1 for the legacy PRF, HMAC-SHA1 and HMAC-SHA256 for records
/// and the TLS 1.2 PRF.
pub trait Hmac: Send + Sync {
    /// Key an HMAC instance.
    fn with_key(&self, key: &[u8]) -> Box<dyn Key>;

    /// Output length of the hash, `L` in RFC 2104.
    fn hash_output_len(&self) -> usize;
}

/// Large enough for SHA-512.
pub(crate) const HMAC_MAX_TAG: usize = 64;

/// An HMAC output.  Zeroed on drop.
#[derive(Clone)]
pub struct Tag {
    buf: [u8; HMAC_MAX_TAG],
    used: usize,
}

impl Tag {
    /// Copy `bytes`, at most `HMAC_MAX_TAG` long, into a tag.
    pub fn new(bytes: &[u8]) -> Self {
        let mut tag = Self {
            buf: [0u8; HMAC_MAX_TAG],
            used: bytes.len(),
        };
        tag.buf[..bytes.len()].copy_from_slice(bytes);
        tag
    }
}

impl Drop for Tag {
    fn drop(&mut self) {
        self.buf.zeroize();
    }
}

impl AsRef<[u8]> for Tag {
    fn as_ref(&self) -> &[u8] {
        &self.buf[..self.used]
    }
}

/// A keyed HMAC.
pub trait Key: Send + Sync {
    /// Tag the concatenation of `data`.
    fn sign(&self, data: &[&[u8]]) -> Tag {
        self.sign_concat(&[], data, &[])
    }

    /// Tag `first`, then each of `middle`, then `last`.
    fn sign_concat(&self, first: &[u8], middle: &[&[u8]], last: &[u8]) -> Tag;

    /// Length of the tags this key produces.
    fn tag_len(&self) -> usize;
}
