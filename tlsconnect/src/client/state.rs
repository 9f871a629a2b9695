use std::fmt;

use crate::client::client_conn::ClientConnectionData;
use crate::conn::CommonState;
use crate::enums::{AlertDescription, HandshakeType};
use crate::error::Error;
use crate::msgs::message::Message;

/// The named steps of a client handshake.
///
/// A connection reports each step it enters to the configured
/// [`HandshakeObserver`], and [`ClientConnection::handshake_state()`]
/// returns the current one.
///
/// A full handshake visits the receive steps up to `RecvServerHelloDone`
/// (skipping those the cipher suite does not use), then the send steps,
/// then `RecvNewSessionTicket` if a ticket was promised, then
/// `RecvFinished`.  A resumed handshake goes from `RecvServerHello`
/// straight to `RecvNewSessionTicket` or `RecvFinished`, and sends its
/// ChangeCipherSpec and Finished afterwards.
///
/// [`ClientConnection::handshake_state()`]: crate::ClientConnection::handshake_state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandshakeState {
    /// Nothing has happened yet.
    Before,
    /// Building and queueing the ClientHello.
    SendClientHello,
    /// Waiting for the ServerHello.
    RecvServerHello,
    /// Waiting for the server's Certificate.
    RecvCertificate,
    /// Waiting for a stapled OCSP response, which the server may omit.
    RecvCertificateStatus,
    /// Waiting for the ServerKeyExchange.
    RecvServerKeyExchange,
    /// Waiting for a CertificateRequest, which the server may omit.
    RecvCertificateRequest,
    /// Waiting for the ServerHelloDone.
    RecvServerHelloDone,
    /// Sending our Certificate, possibly empty.
    SendClientCertificate,
    /// Sending the ClientKeyExchange.
    SendClientKeyExchange,
    /// Sending the CertificateVerify.
    SendCertificateVerify,
    /// Sending the ChangeCipherSpec and switching on encryption.
    SendChangeCipherSpec,
    /// Sending the Finished.
    SendFinished,
    /// Waiting for a NewSessionTicket.
    RecvNewSessionTicket,
    /// Waiting for the server's ChangeCipherSpec and Finished.
    RecvFinished,
    /// The handshake completed.
    Done,
}

/// Receives notifications about a handshake in progress.
///
/// Every method has an empty default, so implementations pick what they
/// need.  Calls happen synchronously, on the thread driving the
/// connection.
pub trait HandshakeObserver: fmt::Debug + Send + Sync {
    /// The connection entered `state`.
    fn state_entered(&self, state: HandshakeState) {
        let _ = state;
    }

    /// A handshake message was added to the transcript.  `encoded` is its
    /// full encoding, header included.
    fn message_hashed(&self, typ: HandshakeType, encoded: &[u8]) {
        let _ = (typ, encoded);
    }

    /// We sent an alert.
    fn alert_sent(&self, description: AlertDescription, fatal: bool) {
        let _ = (description, fatal);
    }
}

/// What a handshake state can reach while handling a message.
pub(crate) struct ClientContext<'a> {
    pub(crate) common: &'a mut CommonState,
    pub(crate) data: &'a mut ClientConnectionData,
}

/// The result of a state handling a message.
pub(crate) enum Transition {
    /// Wait for the next message in this state.
    Next(Box<dyn State>),
    /// Hand the same message to this state: the message was not for the
    /// state that got it, because it skipped an optional message.
    Reuse(Box<dyn State>, Message),
}

impl Transition {
    pub(crate) fn next(state: impl State + 'static) -> Result<Self, Error> {
        Ok(Self::Next(Box::new(state)))
    }

    pub(crate) fn reuse(state: impl State + 'static, m: Message) -> Result<Self, Error> {
        Ok(Self::Reuse(Box::new(state), m))
    }
}

/// One step of the client handshake.
///
/// Each state owns what the handshake has learnt so far, and consumes
/// itself when it handles a message.
pub(crate) trait State: Send + Sync {
    /// Process `m`, producing the next state.
    fn handle(self: Box<Self>, cx: &mut ClientContext<'_>, m: Message) -> Result<Transition, Error>;

    /// The name of this state.
    fn handshake_state(&self) -> HandshakeState;
}

/// Feed `m` to `state`, following any reuses.  Each state reached is
/// entered before it handles anything.
pub(crate) fn drive(
    state: Box<dyn State>,
    cx: &mut ClientContext<'_>,
    m: Message,
) -> Result<Box<dyn State>, Error> {
    let mut transition = state.handle(cx, m)?;
    loop {
        match transition {
            Transition::Next(next) => {
                cx.common.enter(next.handshake_state());
                return Ok(next);
            }
            Transition::Reuse(next, m) => {
                cx.common.enter(next.handshake_state());
                transition = next.handle(cx, m)?;
            }
        }
    }
}
