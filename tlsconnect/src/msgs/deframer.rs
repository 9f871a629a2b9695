use std::io;

use crate::error::{Error, InvalidMessage};
use crate::msgs::codec;
use crate::msgs::message::{MessageError, OpaqueMessage};

/// This deframer works to reconstruct TLS records
/// from arbitrary-sized reads, buffering as necessary.
/// The input is `read()`, the output is `pop()`.
#[derive(Default)]
pub struct MessageDeframer {
    /// Set if the peer is not talking TLS, but some other
    /// protocol.  The caller should abort the connection, because
    /// the deframer cannot recover.
    last_error: Option<Error>,

    /// Buffer of data read from the socket, in the process of being parsed into records.
    buf: Vec<u8>,

    /// What size prefix of `buf` is used.
    used: usize,
}

impl MessageDeframer {
    /// Return any complete record that the deframer has been able to parse.
    ///
    /// Returns an `Error` if the deframer failed to parse some record contents,
    /// `Ok(None)` if no full record is buffered, and `Ok(Some(_))` if a valid
    /// record was found.
    pub fn pop(&mut self) -> Result<Option<OpaqueMessage>, Error> {
        if let Some(last_err) = self.last_error.clone() {
            return Err(last_err);
        } else if self.used == 0 {
            return Ok(None);
        }

        let mut rd = codec::Reader::init(&self.buf[..self.used]);
        let m = match OpaqueMessage::read(&mut rd) {
            Ok(m) => m,
            Err(msg_err) => {
                let err_kind = match msg_err {
                    MessageError::TooShortForHeader | MessageError::TooShortForLength => {
                        return Ok(None)
                    }
                    MessageError::InvalidEmptyPayload => InvalidMessage::InvalidEmptyPayload.into(),
                    MessageError::MessageTooLarge => Error::PeerSentOversizedRecord,
                    MessageError::InvalidContentType => InvalidMessage::InvalidContentType.into(),
                    MessageError::UnknownProtocolVersion => {
                        InvalidMessage::UnknownProtocolVersion.into()
                    }
                };

                self.last_error = Some(err_kind.clone());
                return Err(err_kind);
            }
        };

        let used = rd.used();
        self.buf_consume(used);
        Ok(Some(m))
    }

    /// Read some bytes from `rd`, and add them to our internal buffer.
    #[allow(clippy::comparison_chain)]
    pub fn read(&mut self, rd: &mut dyn io::Read) -> io::Result<usize> {
        if self.used == OpaqueMessage::MAX_WIRE_SIZE {
            return Err(io::Error::new(io::ErrorKind::Other, "message buffer full"));
        }

        // If we can and need to increase the buffer size to allow a 4k read, do so. After
        // dealing with a large message (at most 16kB) the buffer will never be shrunk
        // below the record size limit.
        let need_capacity = Ord::min(OpaqueMessage::MAX_WIRE_SIZE, self.used + READ_SIZE);
        if need_capacity > self.buf.len() {
            self.buf.resize(need_capacity, 0);
        } else if self.used == 0 || self.buf.len() > OpaqueMessage::MAX_WIRE_SIZE {
            self.buf.resize(need_capacity, 0);
            self.buf.shrink_to(need_capacity);
        }

        // Try to do the largest reads possible. Note that if
        // we get a message with a length field out of range here,
        // we do a zero length read.  That looks like an EOF to
        // the next layer up, which is fine.
        let new_bytes = rd.read(&mut self.buf[self.used..])?;
        self.used += new_bytes;
        Ok(new_bytes)
    }

    /// Returns true if we have messages for the caller
    /// to process, either whole messages in our output
    /// queue or partial messages in our buffer.
    pub fn has_pending(&self) -> bool {
        self.used > 0
    }

    fn buf_consume(&mut self, taken: usize) {
        if taken < self.used {
            /* Before:
             * +----------+----------+----------+
             * | taken    | pending  |xxxxxxxxxx|
             * +----------+----------+----------+
             * 0          ^ taken    ^ self.used
             *
             * After:
             * +----------+----------+----------+
             * | pending  |xxxxxxxxxxxxxxxxxxxxx|
             * +----------+----------+----------+
             * 0          ^ self.used
             */

            self.buf
                .copy_within(taken..self.used, 0);
            self.used -= taken;
        } else {
            self.used = 0;
        }
    }
}

const READ_SIZE: usize = 4096;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{ContentType, ProtocolVersion};

    fn input_bytes(d: &mut MessageDeframer, bytes: &[u8]) -> io::Result<usize> {
        let mut rd = io::Cursor::new(bytes);
        d.read(&mut rd)
    }

    const FIRST_MESSAGE: &[u8] = &[0x16, 0x03, 0x01, 0x00, 0x04, 0x0e, 0x00, 0x00, 0x00];
    const SECOND_MESSAGE: &[u8] = &[0x15, 0x03, 0x03, 0x00, 0x02, 0x01, 0x00];

    #[test]
    fn byte_at_a_time() {
        let mut d = MessageDeframer::default();
        for (i, b) in FIRST_MESSAGE.iter().enumerate() {
            assert_eq!(input_bytes(&mut d, &[*b]).unwrap(), 1);
            if i + 1 < FIRST_MESSAGE.len() {
                assert!(d.pop().unwrap().is_none());
                assert!(d.has_pending());
            }
        }

        let m = d.pop().unwrap().unwrap();
        assert_eq!(m.typ, ContentType::Handshake);
        assert_eq!(m.version, ProtocolVersion::TLSv1_0);
        assert!(!d.has_pending());
    }

    #[test]
    fn two_records_in_one_read() {
        let mut d = MessageDeframer::default();
        let both = [FIRST_MESSAGE, SECOND_MESSAGE].concat();
        input_bytes(&mut d, &both).unwrap();
        assert_eq!(d.pop().unwrap().unwrap().typ, ContentType::Handshake);
        assert_eq!(d.pop().unwrap().unwrap().typ, ContentType::Alert);
        assert!(d.pop().unwrap().is_none());
    }

    #[test]
    fn oversized_record_is_sticky_error() {
        let mut d = MessageDeframer::default();
        input_bytes(&mut d, &[0x17, 0x03, 0x03, 0xff, 0xff]).unwrap();
        assert_eq!(d.pop().unwrap_err(), Error::PeerSentOversizedRecord);
        assert_eq!(d.pop().unwrap_err(), Error::PeerSentOversizedRecord);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let mut d = MessageDeframer::default();
        input_bytes(&mut d, b"GET / HTTP/1.1\r\n").unwrap();
        assert_eq!(
            d.pop().unwrap_err(),
            Error::InvalidMessage(InvalidMessage::InvalidContentType)
        );
    }
}
