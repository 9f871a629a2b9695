use std::collections::VecDeque;

use crate::enums::{ContentType, ProtocolVersion};
use crate::error::InvalidMessage;
use crate::msgs::base::Payload;
use crate::msgs::codec::{self, Codec};
use crate::msgs::handshake::HandshakeMessagePayload;
use crate::msgs::message::{Message, MessagePayload, PlainMessage};

const HEADER_SIZE: usize = 1 + 3;

/// This works to reconstruct TLS handshake messages
/// from individual TLS records.  It's guaranteed that
/// messages output from this layer contain precisely
/// one handshake payload.
///
/// Complete messages are kept in encoded form until `pop`, since how
/// some of them decode depends on the protocol version negotiated by an
/// earlier message in the same record.
pub struct HandshakeJoiner {
    /// Completed, still-encoded handshake messages.
    frames: VecDeque<Vec<u8>>,

    /// The message payload we're currently accumulating.
    buf: Vec<u8>,

    /// Largest handshake message body we accept.
    max_message_size: usize,
}

enum BufferState {
    /// Buffer contains a header that introduces a message that is too long.
    MessageTooLarge,

    /// Buffer contains a full header and body.
    OneMessage(usize),

    /// We need more data to see a header and complete body.
    NeedsMoreData,
}

impl HandshakeJoiner {
    /// Make a new HandshakeJoiner, refusing messages whose body is
    /// longer than `max_message_size`.
    pub fn new(max_message_size: usize) -> Self {
        Self {
            frames: VecDeque::new(),
            buf: Vec::new(),
            max_message_size,
        }
    }

    /// Do we want to process this message?
    pub fn want_message(&self, msg: &PlainMessage) -> bool {
        msg.typ == ContentType::Handshake
    }

    /// Is a message fragment buffered, waiting for the rest of it?
    pub fn has_partial(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Are there no buffered bytes and no complete messages?
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty() && self.frames.is_empty()
    }

    /// Take the record, and join/split it as needed.
    /// Return the number of new messages added to the
    /// output queue as a result of this record.
    pub fn take_message(&mut self, msg: PlainMessage) -> Result<usize, InvalidMessage> {
        if msg.payload.bytes().is_empty() {
            return Err(InvalidMessage::InvalidEmptyPayload);
        }

        // The vast majority of the time `self.buf` will be empty since most
        // handshake messages arrive in a single fragment. Avoid allocating and
        // copying in that common case.
        if self.buf.is_empty() {
            self.buf = msg.payload.into_vec();
        } else {
            self.buf
                .extend_from_slice(msg.payload.bytes());
        }

        let mut count = 0;
        loop {
            match self.buf_contains_message() {
                BufferState::MessageTooLarge => return Err(InvalidMessage::HandshakePayloadTooLarge),
                BufferState::NeedsMoreData => break,
                BufferState::OneMessage(len) => {
                    let rest = self.buf.split_off(len);
                    self.frames
                        .push_back(std::mem::replace(&mut self.buf, rest));
                    count += 1;
                }
            }
        }

        Ok(count)
    }

    /// Decode the oldest complete message, using `version` to select
    /// version-dependent layouts.
    pub fn pop(&mut self, version: ProtocolVersion) -> Result<Option<Message>, InvalidMessage> {
        let encoded = match self.frames.pop_front() {
            Some(encoded) => encoded,
            None => return Ok(None),
        };

        let mut rd = codec::Reader::init(&encoded);
        let parsed = HandshakeMessagePayload::read_version(&mut rd, version)?;
        Ok(Some(Message {
            version,
            payload: MessagePayload::Handshake {
                parsed,
                encoded: Payload::new(encoded),
            },
        }))
    }

    /// Does our `buf` contain a full handshake payload?  It does if it is big
    /// enough to contain a header, and that header has a length which falls
    /// within `buf`.
    fn buf_contains_message(&self) -> BufferState {
        if self.buf.len() < HEADER_SIZE {
            return BufferState::NeedsMoreData;
        }

        let (header, rest) = self.buf.split_at(HEADER_SIZE);
        match codec::u24::read_bytes(&header[1..]) {
            Ok(len) if usize::from(len) > self.max_message_size => BufferState::MessageTooLarge,
            Ok(len) if rest.len() >= usize::from(len) => {
                BufferState::OneMessage(HEADER_SIZE + usize::from(len))
            }
            _ => BufferState::NeedsMoreData,
        }
    }
}
