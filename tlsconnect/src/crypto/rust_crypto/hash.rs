use std::marker::PhantomData;

use sha2::Digest;

use crate::crypto::hash;

/// A [`hash::Hash`] over any RustCrypto [`Digest`].
pub(crate) struct DigestHash<D> {
    algorithm: hash::HashAlgorithm,
    _digest: PhantomData<fn() -> D>,
}

impl<D> DigestHash<D> {
    const fn new(algorithm: hash::HashAlgorithm) -> Self {
        Self {
            algorithm,
            _digest: PhantomData,
        }
    }
}

pub(crate) static MD5: DigestHash<md5::Md5> = DigestHash::new(hash::HashAlgorithm::MD5);
pub(crate) static SHA1: DigestHash<sha1::Sha1> = DigestHash::new(hash::HashAlgorithm::SHA1);
pub(crate) static SHA256: DigestHash<sha2::Sha256> = DigestHash::new(hash::HashAlgorithm::SHA256);

impl<D> hash::Hash for DigestHash<D>
where
    D: Digest + Clone + Send + Sync + 'static,
{
    fn start(&self) -> Box<dyn hash::Context> {
        Box::new(DigestContext(D::new()))
    }

    fn hash(&self, data: &[u8]) -> hash::Output {
        hash::Output::new(&D::digest(data)[..])
    }

    fn output_len(&self) -> usize {
        <D as Digest>::output_size()
    }

    fn algorithm(&self) -> hash::HashAlgorithm {
        self.algorithm
    }
}

struct DigestContext<D>(D);

impl<D> hash::Context for DigestContext<D>
where
    D: Digest + Clone + Send + Sync + 'static,
{
    fn fork_finish(&self) -> hash::Output {
        hash::Output::new(&self.0.clone().finalize()[..])
    }

    fn fork(&self) -> Box<dyn hash::Context> {
        Box::new(Self(self.0.clone()))
    }

    fn finish(self: Box<Self>) -> hash::Output {
        hash::Output::new(&self.0.finalize()[..])
    }

    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }
}

/// The TLS 1.0/1.1 transcript hash: `MD5(m) || SHA1(m)`.
pub(crate) struct Md5Sha1;

impl hash::Hash for Md5Sha1 {
    fn start(&self) -> Box<dyn hash::Context> {
        Box::new(Md5Sha1Context {
            md5: md5::Md5::new(),
            sha1: sha1::Sha1::new(),
        })
    }

    fn hash(&self, data: &[u8]) -> hash::Output {
        hash::Output::concat(&md5::Md5::digest(data), &sha1::Sha1::digest(data))
    }

    fn output_len(&self) -> usize {
        16 + 20
    }

    fn algorithm(&self) -> hash::HashAlgorithm {
        hash::HashAlgorithm::NONE
    }
}

#[derive(Clone)]
struct Md5Sha1Context {
    md5: md5::Md5,
    sha1: sha1::Sha1,
}

impl hash::Context for Md5Sha1Context {
    fn fork_finish(&self) -> hash::Output {
        hash::Context::finish(Box::new(self.clone()))
    }

    fn fork(&self) -> Box<dyn hash::Context> {
        Box::new(self.clone())
    }

    fn finish(self: Box<Self>) -> hash::Output {
        let Self { md5, sha1 } = *self;
        hash::Output::concat(&md5.finalize(), &sha1.finalize())
    }

    fn update(&mut self, data: &[u8]) {
        self.md5.update(data);
        self.sha1.update(data);
    }
}
