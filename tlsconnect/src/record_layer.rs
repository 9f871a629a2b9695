use crate::crypto::cipher::{MessageDecrypter, MessageEncrypter};
use crate::error::{Error, PeerMisbehaved};
#[cfg(feature = "logging")]
use crate::log::warn;
use crate::msgs::message::{BorrowedPlainMessage, OpaqueMessage, PlainMessage};
use crate::tls12::MessageCipherPair;

static SEQ_SOFT_LIMIT: u64 = 0xffff_ffff_ffff_0000u64;
static SEQ_HARD_LIMIT: u64 = 0xffff_ffff_ffff_fffeu64;

#[derive(Debug, PartialEq)]
enum DirectionState {
    /// No keying material.
    Invalid,

    /// Keying material present, but not yet in use.
    Prepared,

    /// Keying material in use.
    Active,
}

/// Record layer that tracks decryption and encryption keys.
///
/// Keys for both directions are installed together once the master secret
/// is known; each direction becomes active separately, at the
/// ChangeCipherSpec we send or receive.
pub(crate) struct RecordLayer {
    message_encrypter: Box<dyn MessageEncrypter>,
    message_decrypter: Box<dyn MessageDecrypter>,
    write_seq: u64,
    read_seq: u64,
    encrypt_state: DirectionState,
    decrypt_state: DirectionState,
}

impl RecordLayer {
    /// Create new record layer with no keys.
    pub(crate) fn new() -> Self {
        Self {
            message_encrypter: <dyn MessageEncrypter>::invalid(),
            message_decrypter: <dyn MessageDecrypter>::invalid(),
            write_seq: 0,
            read_seq: 0,
            encrypt_state: DirectionState::Invalid,
            decrypt_state: DirectionState::Invalid,
        }
    }

    /// Decrypt a TLS message.
    ///
    /// Before the peer's ChangeCipherSpec records pass through unchanged.
    pub(crate) fn decrypt_incoming(&mut self, encr: OpaqueMessage) -> Result<PlainMessage, Error> {
        if self.decrypt_state != DirectionState::Active {
            return Ok(encr.into_plain_message());
        }

        if self.read_seq == SEQ_SOFT_LIMIT {
            warn!("Peer is close to exhausting its record sequence numbers");
        }

        let plaintext = self
            .message_decrypter
            .decrypt(encr, self.read_seq)?;
        self.read_seq += 1;
        Ok(plaintext)
    }

    /// Encrypt a TLS message.
    ///
    /// `plain` is a TLS message we'd like to send.  Encryption must
    /// already have started.
    pub(crate) fn encrypt_outgoing(
        &mut self,
        plain: BorrowedPlainMessage<'_>,
    ) -> Result<OpaqueMessage, Error> {
        debug_assert!(self.encrypt_state == DirectionState::Active);
        if self.encrypt_exhausted() {
            return Err(Error::EncryptError);
        }

        let seq = self.write_seq;
        self.write_seq += 1;
        self.message_encrypter
            .encrypt(plain, seq)
    }

    /// Install the keys for both directions.  Neither is used until
    /// `start_encrypting` or `start_decrypting`.
    pub(crate) fn prepare_cipher_pair(&mut self, (decrypter, encrypter): MessageCipherPair) {
        self.message_encrypter = encrypter;
        self.write_seq = 0;
        self.encrypt_state = DirectionState::Prepared;

        self.message_decrypter = decrypter;
        self.read_seq = 0;
        self.decrypt_state = DirectionState::Prepared;
    }

    /// Start using the prepared `MessageEncrypter`.
    pub(crate) fn start_encrypting(&mut self) {
        debug_assert!(self.encrypt_state == DirectionState::Prepared);
        self.encrypt_state = DirectionState::Active;
    }

    /// Start using the prepared `MessageDecrypter`.
    pub(crate) fn start_decrypting(&mut self) -> Result<(), Error> {
        match self.decrypt_state {
            DirectionState::Prepared => {
                self.decrypt_state = DirectionState::Active;
                Ok(())
            }
            _ => Err(PeerMisbehaved::IllegalChangeCipherSpec.into()),
        }
    }

    /// Return true if we are getting close to encrypting too many
    /// messages with our encryption key.
    pub(crate) fn wants_close_before_encrypt(&self) -> bool {
        self.write_seq == SEQ_SOFT_LIMIT
    }

    /// Return true if we outright refuse to do anything with the
    /// encryption key.
    pub(crate) fn encrypt_exhausted(&self) -> bool {
        self.write_seq >= SEQ_HARD_LIMIT
    }

    pub(crate) fn is_encrypting(&self) -> bool {
        self.encrypt_state == DirectionState::Active
    }

    pub(crate) fn is_decrypting(&self) -> bool {
        self.decrypt_state == DirectionState::Active
    }

    #[cfg(test)]
    pub(crate) fn write_seq(&self) -> u64 {
        self.write_seq
    }

    #[cfg(test)]
    pub(crate) fn read_seq(&self) -> u64 {
        self.read_seq
    }
}
