use crate::enums::{ContentType, ProtocolVersion};
use crate::msgs::message::BorrowedPlainMessage;
use crate::Error;

/// The protocol's plaintext limit for one record, 2^14 bytes.
pub(crate) const MAX_PLAINTEXT_LEN: usize = 0x4000;

/// Content type, version and length.
pub(crate) const RECORD_HEADER_LEN: usize = 5;

const MIN_RECORD_LEN: usize = 32;
const MAX_RECORD_LEN: usize = MAX_PLAINTEXT_LEN + RECORD_HEADER_LEN;

/// Splits outgoing payloads into plaintext records of bounded size.
///
/// Each payload is split on its own: bytes of different messages never
/// share a record.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RecordSplitter {
    chunk_len: usize,
}

impl RecordSplitter {
    /// `max_record_len` bounds the unencrypted record, header included.
    /// `None` leaves only the protocol's own limit.
    pub(crate) fn new(max_record_len: Option<usize>) -> Result<Self, Error> {
        let chunk_len = match max_record_len {
            None => MAX_PLAINTEXT_LEN,
            Some(len) if (MIN_RECORD_LEN..=MAX_RECORD_LEN).contains(&len) => {
                len - RECORD_HEADER_LEN
            }
            Some(len) => {
                return Err(Error::General(format!(
                    "max_fragment_size {len} is outside {MIN_RECORD_LEN}..={MAX_RECORD_LEN}"
                )))
            }
        };
        Ok(Self { chunk_len })
    }

    pub(crate) fn split<'a>(
        self,
        typ: ContentType,
        version: ProtocolVersion,
        payload: &'a [u8],
    ) -> impl Iterator<Item = BorrowedPlainMessage<'a>> + 'a {
        payload
            .chunks(self.chunk_len)
            .map(move |payload| BorrowedPlainMessage {
                typ,
                version,
                payload,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lengths(splitter: RecordSplitter, payload: &[u8]) -> Vec<usize> {
        splitter
            .split(ContentType::Handshake, ProtocolVersion::TLSv1_2, payload)
            .map(|record| {
                record
                    .to_unencrypted_opaque()
                    .encode()
                    .len()
            })
            .collect()
    }

    #[test]
    fn smallest_records() {
        let payload: Vec<u8> = (1..70u8).collect();
        let splitter = RecordSplitter::new(Some(32)).unwrap();
        assert_eq!(lengths(splitter, &payload), [32, 32, 20]);

        let records: Vec<_> = splitter
            .split(ContentType::Handshake, ProtocolVersion::TLSv1_2, &payload)
            .collect();
        assert_eq!(records[0].payload, &payload[..27]);
        assert_eq!(records[1].payload, &payload[27..54]);
        assert_eq!(records[2].payload, &payload[54..]);
        assert!(records
            .iter()
            .all(|r| r.typ == ContentType::Handshake && r.version == ProtocolVersion::TLSv1_2));
    }

    #[test]
    fn short_payload_is_one_record() {
        let splitter = RecordSplitter::new(Some(32)).unwrap();
        assert_eq!(lengths(splitter, &[7; 8]), [RECORD_HEADER_LEN + 8]);
    }

    #[test]
    fn default_is_protocol_limit() {
        let splitter = RecordSplitter::new(None).unwrap();
        let payload = vec![0u8; MAX_PLAINTEXT_LEN + 1];
        assert_eq!(
            lengths(splitter, &payload),
            [MAX_RECORD_LEN, RECORD_HEADER_LEN + 1]
        );
    }

    #[test]
    fn empty_payload_has_no_records() {
        let splitter = RecordSplitter::new(None).unwrap();
        assert!(lengths(splitter, &[]).is_empty());
    }

    #[test]
    fn out_of_range_sizes_are_refused() {
        assert!(RecordSplitter::new(Some(MIN_RECORD_LEN - 1)).is_err());
        assert!(RecordSplitter::new(Some(MAX_RECORD_LEN + 1)).is_err());
        assert!(RecordSplitter::new(Some(MAX_RECORD_LEN)).is_ok());
    }
}
