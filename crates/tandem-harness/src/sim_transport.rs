//! Framed stream transport for turmoil network simulation.
//!
//! Two peers talk over one simulated TCP connection. `StreamTransport` is the
//! synchronous [`Transport`] the session sees: sends are framed into an
//! outbox. `StreamPeer` owns the socket and moves bytes in both directions
//! between session steps.
//!
//! The connection is the room: the peer that accepted it is the authority,
//! and the room holds two members while the stream is up.

use std::{io, time::Duration};

use bytes::BytesMut;
use tandem_client::{SessionContext, Transport, TransportError};
use tandem_core::{Membership, SessionConfig};
use tandem_proto::{FrameDecoder, Payload, PeerId, encode_frame};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use turmoil::net::TcpStream;

use crate::sim_env::SimEnv;

/// Read buffer size per poll.
const READ_CHUNK: usize = 1024;

/// Outbound half of a framed connection.
#[derive(Debug)]
pub struct StreamTransport {
    local: PeerId,
    authority: bool,
    connected: bool,
    room_open: bool,
    outbox: BytesMut,
}

impl StreamTransport {
    /// Transport for `local`; `authority` is true on the accepting side.
    pub fn new(local: PeerId, authority: bool) -> Self {
        Self { local, authority, connected: true, room_open: true, outbox: BytesMut::new() }
    }

    /// Whether the room still accepts peers.
    pub fn is_room_open(&self) -> bool {
        self.room_open
    }

    /// Whether the connection is still up.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn take_outbound(&mut self) -> BytesMut {
        self.outbox.split()
    }
}

impl Membership for StreamTransport {
    fn is_authority(&self) -> bool {
        self.authority
    }

    fn current_roster_size(&self) -> usize {
        if self.connected { 2 } else { 1 }
    }
}

impl Transport for StreamTransport {
    fn local_peer(&self) -> PeerId {
        self.local
    }

    fn send_to_peers(&mut self, payload: &Payload) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::Disconnected);
        }
        encode_frame(payload, &mut self.outbox).map_err(|e| TransportError::Rejected(e.to_string()))
    }

    fn close_room(&mut self) -> Result<(), TransportError> {
        self.room_open = false;
        Ok(())
    }

    fn leave_room(&mut self) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::Disconnected);
        }
        self.connected = false;
        Ok(())
    }
}

/// One end of a simulated connection driving a session.
pub struct StreamPeer {
    ctx: SessionContext<SimEnv, StreamTransport>,
    stream: TcpStream,
    decoder: FrameDecoder,
    remote: PeerId,
}

impl StreamPeer {
    /// Wrap an established stream. The remote peer is reported as joined.
    pub fn new(
        env: SimEnv,
        stream: TcpStream,
        local: PeerId,
        remote: PeerId,
        authority: bool,
        config: SessionConfig,
    ) -> Self {
        let ctx = SessionContext::new(env, StreamTransport::new(local, authority), config);
        ctx.inbox().push_peer_joined(remote);
        Self { ctx, stream, decoder: FrameDecoder::new(), remote }
    }

    /// Session context.
    pub fn context(&self) -> &SessionContext<SimEnv, StreamTransport> {
        &self.ctx
    }

    /// Session context, mutably.
    pub fn context_mut(&mut self) -> &mut SessionContext<SimEnv, StreamTransport> {
        &mut self.ctx
    }

    /// Process queued events and write pending frames.
    pub async fn flush(&mut self) -> io::Result<()> {
        self.ctx.pump();
        let outbound = self.ctx.transport_mut().take_outbound();
        if !outbound.is_empty() {
            self.stream.write_all(&outbound).await?;
        }
        Ok(())
    }

    /// Flush, then wait up to `wait` for inbound bytes and process them.
    ///
    /// Returns false once the remote side has closed the connection.
    pub async fn step(&mut self, wait: Duration) -> io::Result<bool> {
        self.flush().await?;

        let mut buf = [0u8; READ_CHUNK];
        let read = match tokio::time::timeout(wait, self.stream.read(&mut buf)).await {
            Ok(read) => read?,
            Err(_elapsed) => return Ok(true),
        };

        if read == 0 {
            tracing::info!(remote = %self.remote, "connection closed by peer");
            self.ctx.transport_mut().connected = false;
            self.ctx.inbox().push_peer_left(self.remote);
            self.ctx.pump();
            return Ok(false);
        }

        self.decoder.extend(&buf[..read]);
        loop {
            match self.decoder.next_payload() {
                Ok(Some(payload)) => self.ctx.inbox().push_message(self.remote, payload),
                Ok(None) => break,
                Err(e) if e.is_fatal() => {
                    return Err(io::Error::new(io::ErrorKind::InvalidData, e));
                },
                Err(e) => tracing::warn!("skipping undecodable frame: {e}"),
            }
        }

        self.flush().await?;
        Ok(true)
    }

    /// Close the write side of the connection.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.flush().await?;
        self.stream.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use tandem_proto::{FlagId, Mutation};

    use super::*;

    #[test]
    fn sends_are_framed_into_the_outbox() {
        let mut transport = StreamTransport::new(PeerId(1), true);
        let payload = Payload::from(Mutation::flag(FlagId::TestFlagA, true));

        transport.send_to_peers(&payload).unwrap();
        transport.send_to_peers(&payload).unwrap();

        let mut decoder = FrameDecoder::new();
        decoder.extend(&transport.take_outbound());
        assert_eq!(decoder.next_payload().unwrap(), Some(payload.clone()));
        assert_eq!(decoder.next_payload().unwrap(), Some(payload));
        assert_eq!(decoder.next_payload().unwrap(), None);
    }

    #[test]
    fn disconnected_transport_shrinks_room() {
        let mut transport = StreamTransport::new(PeerId(2), false);

        transport.leave_room().unwrap();

        assert_eq!(transport.current_roster_size(), 1);
        assert_eq!(
            transport.send_to_peers(&Payload::Transition { initiated_by: PeerId(1) }),
            Err(TransportError::Disconnected)
        );
    }
}
