use std::fmt;

use pki_types::{CertificateDer, TrustAnchor};
use webpki::anchor_from_trusted_cert;

use super::pki_error;
#[cfg(feature = "logging")]
use crate::log::{debug, trace};
use crate::Error;

/// The trust anchors server certificate chains are verified against.
#[derive(Clone)]
pub struct RootCertStore {
    /// Anchors, in the order they were added.
    pub roots: Vec<TrustAnchor<'static>>,
}

impl RootCertStore {
    /// A store that trusts nothing.
    pub fn empty() -> Self {
        Self { roots: Vec::new() }
    }

    /// Add every certificate in `der_certs` that parses as a trust anchor,
    /// skipping the rest.
    ///
    /// Returns `(added, skipped)`.
    pub fn add_parsable_certificates<'a>(
        &mut self,
        der_certs: impl IntoIterator<Item = CertificateDer<'a>>,
    ) -> (usize, usize) {
        let before = self.roots.len();
        let mut skipped = 0;

        for der in der_certs {
            match self.add(der) {
                Ok(()) => {}
                Err(_err) => {
                    trace!("skipping unparsable trust anchor: {_err}");
                    skipped += 1;
                }
            }
        }

        let added = self.roots.len() - before;
        debug!("root store: {added} anchors added, {skipped} skipped");
        (added, skipped)
    }

    /// Add one DER certificate as a trust anchor.
    pub fn add(&mut self, der: CertificateDer<'_>) -> Result<(), Error> {
        let anchor = anchor_from_trusted_cert(&der).map_err(pki_error)?;
        self.roots.push(anchor.to_owned());
        Ok(())
    }

    /// True if the store trusts nothing.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of trust anchors.
    pub fn len(&self) -> usize {
        self.roots.len()
    }
}

impl FromIterator<TrustAnchor<'static>> for RootCertStore {
    fn from_iter<T: IntoIterator<Item = TrustAnchor<'static>>>(iter: T) -> Self {
        Self {
            roots: iter.into_iter().collect(),
        }
    }
}

impl fmt::Debug for RootCertStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootCertStore")
            .field("roots", &format!("({} roots)", self.roots.len()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_cert_store_debug() {
        use core::iter;

        use pki_types::Der;

        let ta = TrustAnchor {
            subject: Der::from_slice(&[]),
            subject_public_key_info: Der::from_slice(&[]),
            name_constraints: None,
        };
        let store = RootCertStore::from_iter(iter::repeat(ta).take(3));

        assert_eq!(
            format!("{store:?}"),
            "RootCertStore { roots: \"(3 roots)\" }"
        );
    }

    #[test]
    fn garbage_is_counted_not_added() {
        let mut store = RootCertStore::empty();
        let (good, bad) =
            store.add_parsable_certificates([CertificateDer::from(vec![0x30, 0x03, 0x02, 0x01])]);
        assert_eq!((good, bad), (0, 1));
        assert!(store.is_empty());
        assert!(store
            .add(CertificateDer::from(vec![0x01, 0x02]))
            .is_err());
    }
}
