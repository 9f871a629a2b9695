use std::io;
use std::sync::Arc;

use crate::client::{HandshakeObserver, HandshakeState};
use crate::enums::{AlertDescription, ContentType, ProtocolVersion};
use crate::error::{Error, PeerMisbehaved};
use crate::hash_hs::{HandshakeHash, HandshakeHashBuffer};
#[cfg(feature = "logging")]
use crate::log::{debug, error, trace, warn};
use crate::msgs::alert::AlertMessagePayload;
use crate::msgs::base::Payload;
use crate::msgs::fragmenter::RecordSplitter;
use crate::msgs::message::{BorrowedPlainMessage, Message, MessagePayload, PlainMessage};
use crate::record_layer::RecordLayer;
use crate::suites::SupportedCipherSuite;
use crate::tls12::MessageCipherPair;
use crate::vecbuf::BufferQueue;

/// Connection state shared by the handshake and the traffic phase.
///
/// This owns the record layer and both byte queues; handshake states
/// reach it through their context.
pub(crate) struct CommonState {
    pub(crate) negotiated_version: Option<ProtocolVersion>,
    pub(crate) suite: Option<SupportedCipherSuite>,
    pub(crate) record_layer: RecordLayer,
    splitter: RecordSplitter,
    sendable_tls: BufferQueue,
    received_plaintext: BufferQueue,
    may_send_application_data: bool,
    may_receive_application_data: bool,
    pub(crate) has_received_close_notify: bool,
    pub(crate) has_seen_eof: bool,
    sent_fatal_alert: bool,
    /// Set by the connection before each non-handshake message: true if
    /// no handshake bytes are buffered.
    pub(crate) aligned_handshake: bool,
    handshake_state: HandshakeState,
    observer: Option<Arc<dyn HandshakeObserver>>,
}

impl CommonState {
    pub(crate) fn new(
        max_fragment_size: Option<usize>,
        observer: Option<Arc<dyn HandshakeObserver>>,
    ) -> Result<Self, Error> {
        let splitter = RecordSplitter::new(max_fragment_size)?;

        Ok(Self {
            negotiated_version: None,
            suite: None,
            record_layer: RecordLayer::new(),
            splitter,
            sendable_tls: BufferQueue::new(),
            received_plaintext: BufferQueue::new(),
            may_send_application_data: false,
            may_receive_application_data: false,
            has_received_close_notify: false,
            has_seen_eof: false,
            sent_fatal_alert: false,
            aligned_handshake: true,
            handshake_state: HandshakeState::Before,
            observer,
        })
    }

    /// Returns true if the caller should call `write_tls` as soon as possible.
    pub(crate) fn wants_write(&self) -> bool {
        !self.sendable_tls.is_empty()
    }

    /// Returns true if the connection is currently performing the TLS handshake.
    pub(crate) fn is_handshaking(&self) -> bool {
        !(self.may_send_application_data && self.may_receive_application_data)
    }

    pub(crate) fn handshake_state(&self) -> HandshakeState {
        self.handshake_state
    }

    /// Move to `state`, telling the observer if this is a change.
    pub(crate) fn enter(&mut self, state: HandshakeState) {
        if state == self.handshake_state {
            return;
        }

        trace!("Handshake state {:?} -> {:?}", self.handshake_state, state);
        self.handshake_state = state;
        if let Some(observer) = &self.observer {
            observer.state_entered(state);
        }
    }

    /// Add `m` to the transcript, and tell the observer.
    pub(crate) fn hash_message(&self, transcript: &mut HandshakeHash, m: &Message) {
        transcript.add_message(m);
        self.observe_hashed(m);
    }

    /// Like `hash_message`, for the buffered transcript before ServerHello.
    pub(crate) fn hash_early_message(&self, transcript: &mut HandshakeHashBuffer, m: &Message) {
        transcript.add_message(m);
        self.observe_hashed(m);
    }

    fn observe_hashed(&self, m: &Message) {
        if let (Some(observer), MessagePayload::Handshake { parsed, encoded }) =
            (&self.observer, &m.payload)
        {
            observer.message_hashed(parsed.typ, encoded.bytes());
        }
    }

    /// Fail if a handshake message is only partly received: the peer
    /// must not change keys in the middle of one.
    pub(crate) fn check_aligned_handshake(&self) -> Result<(), Error> {
        match self.aligned_handshake {
            true => Ok(()),
            false => Err(PeerMisbehaved::KeyEpochWithPendingFragment.into()),
        }
    }

    fn record_version(&self) -> ProtocolVersion {
        self.negotiated_version
            .unwrap_or(ProtocolVersion::TLSv1_0)
    }

    /// Send a raw TLS message, fragmenting it if needed.
    pub(crate) fn send_msg(&mut self, m: Message, must_encrypt: bool) -> Result<(), Error> {
        let plain = PlainMessage::from(m);
        let version = self.record_version();
        let splitter = self.splitter;
        let records = splitter.split(plain.typ, version, plain.payload.bytes());

        if !must_encrypt {
            for record in records {
                self.sendable_tls
                    .enqueue(record.to_unencrypted_opaque().encode());
            }
            return Ok(());
        }

        for record in records {
            self.send_single_fragment(record)?;
        }
        Ok(())
    }

    fn send_single_fragment(&mut self, m: BorrowedPlainMessage<'_>) -> Result<(), Error> {
        // Close connection once we start to run out of
        // sequence space.
        if self
            .record_layer
            .wants_close_before_encrypt()
        {
            self.send_close_notify();
        }

        let em = self.record_layer.encrypt_outgoing(m)?;
        self.sendable_tls.enqueue(em.encode());
        Ok(())
    }

    /// Encrypt and queue application data.
    pub(crate) fn send_appdata(&mut self, data: &[u8]) -> Result<(), Error> {
        debug_assert!(self.may_send_application_data);
        let version = self.record_version();
        let splitter = self.splitter;
        for record in splitter.split(ContentType::ApplicationData, version, data) {
            self.send_single_fragment(record)?;
        }
        Ok(())
    }

    /// Install keys for both directions; neither is used yet.
    pub(crate) fn prepare_encryption(&mut self, pair: MessageCipherPair) {
        self.record_layer.prepare_cipher_pair(pair);
    }

    /// Both directions are keyed and Finished has been checked.
    pub(crate) fn start_traffic(&mut self) {
        self.may_send_application_data = true;
        self.may_receive_application_data = true;
    }

    pub(crate) fn take_received_plaintext(&mut self, bytes: Payload<'_>) {
        self.received_plaintext
            .enqueue(bytes.into_vec());
    }

    /// Read decrypted application data.
    ///
    /// An empty buffer gives `WouldBlock`, unless the peer has closed
    /// the connection: cleanly (`Ok(0)`), or not (`UnexpectedEof`).
    pub(crate) fn read_plaintext(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = self.received_plaintext.read(buf)?;

        if len == 0 && !buf.is_empty() {
            if self.has_received_close_notify {
                return Ok(0);
            } else if self.has_seen_eof {
                return Err(io::ErrorKind::UnexpectedEof.into());
            }
            return Err(io::ErrorKind::WouldBlock.into());
        }

        Ok(len)
    }

    /// Writes TLS messages to `wr`.
    pub(crate) fn write_tls(&mut self, wr: &mut dyn io::Write) -> io::Result<usize> {
        self.sendable_tls.write_to(wr)
    }

    fn send_warning_alert_no_log(&mut self, desc: AlertDescription) {
        let m = Message::build_alert(AlertMessagePayload::warning(desc));
        let must_encrypt = self.record_layer.is_encrypting();
        if let Err(e) = self.send_msg(m, must_encrypt) {
            debug!("Failed to send alert {:?}: {}", desc, e);
            return;
        }

        if let Some(observer) = &self.observer {
            observer.alert_sent(desc, false);
        }
    }

    pub(crate) fn send_warning_alert(&mut self, desc: AlertDescription) {
        warn!("Sending warning alert {:?}", desc);
        self.send_warning_alert_no_log(desc);
    }

    /// Queue a fatal alert.  Only the first one is ever sent.
    pub(crate) fn send_fatal_alert(&mut self, desc: AlertDescription) {
        if self.sent_fatal_alert {
            return;
        }

        warn!("Sending fatal alert {:?}", desc);
        let m = Message::build_alert(AlertMessagePayload::fatal(desc));
        let must_encrypt = self.record_layer.is_encrypting();
        if let Err(e) = self.send_msg(m, must_encrypt) {
            debug!("Failed to send alert {:?}: {}", desc, e);
        }
        self.sent_fatal_alert = true;

        if let Some(observer) = &self.observer {
            observer.alert_sent(desc, true);
        }
    }

    /// Queues a close_notify warning alert to be sent in the next
    /// `write_tls` call.
    pub(crate) fn send_close_notify(&mut self) {
        debug!("Sending warning alert {:?}", AlertDescription::CloseNotify);
        self.send_warning_alert_no_log(AlertDescription::CloseNotify);
    }

    /// Act on a received alert.
    pub(crate) fn process_alert(&mut self, alert: &AlertMessagePayload) -> Result<(), Error> {
        if !alert.is_fatal() {
            if alert.description != AlertDescription::CloseNotify {
                warn!("TLS alert warning received: {:#?}", alert);
                return Ok(());
            }

            // close_notify mid-handshake is the peer giving up
            if self.is_handshaking() {
                return Err(Error::AlertReceived(AlertDescription::CloseNotify));
            }

            debug!("Received close_notify");
            self.has_received_close_notify = true;
            return Ok(());
        }

        error!("TLS alert received: {:#?}", alert);
        Err(Error::AlertReceived(alert.description))
    }
}
