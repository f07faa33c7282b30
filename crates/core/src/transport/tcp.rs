use std::io::{self, ErrorKind, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};

use super::ByteSource;
use crate::error::Result;

/// Upper bound on what a single [`ByteSource::available`] call reports.
const PEEK_WINDOW: usize = 16 * 1024;

/// [`ByteSource`] over a non-blocking TCP connection.
///
/// `available` peeks into a scratch window rather than reading, so bytes
/// stay in the kernel until the caller has room for them. A zero-length
/// peek or read, or a reset from the peer, marks the source disconnected.
pub struct TcpByteSource {
    stream: TcpStream,
    peer_addr: SocketAddr,
    connected: bool,
    scratch: Box<[u8]>,
}

impl TcpByteSource {
    /// Wrap an accepted stream, switching it to non-blocking mode.
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        let peer_addr = stream.peer_addr()?;
        stream.set_nonblocking(true)?;
        Ok(Self {
            stream,
            peer_addr,
            connected: true,
            scratch: vec![0u8; PEEK_WINDOW].into_boxed_slice(),
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    fn mark_closed(&mut self, reason: &'static str) {
        if self.connected {
            tracing::debug!(peer = %self.peer_addr, reason, "TCP source closed");
        }
        self.connected = false;
    }
}

impl ByteSource for TcpByteSource {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn available(&mut self) -> usize {
        if !self.connected {
            return 0;
        }
        match self.stream.peek(&mut self.scratch) {
            Ok(0) => {
                self.mark_closed("end of stream");
                0
            }
            Ok(n) => n,
            Err(e) if is_transient(e.kind()) => 0,
            Err(e) => {
                tracing::debug!(peer = %self.peer_addr, error = %e, "peek failed");
                self.mark_closed("peek error");
                0
            }
        }
    }

    fn read_up_to(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        if dst.is_empty() || !self.connected {
            return Ok(0);
        }
        match self.stream.read(dst) {
            Ok(0) => {
                self.mark_closed("end of stream");
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) if is_transient(e.kind()) => Ok(0),
            Err(e) => {
                if is_disconnect(e.kind()) {
                    self.mark_closed("connection lost");
                }
                Err(e)
            }
        }
    }
}

fn is_transient(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::WouldBlock | ErrorKind::Interrupted)
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::NotConnected
            | ErrorKind::UnexpectedEof
    )
}

/// Accept one pending connection from a non-blocking listener.
///
/// Returns `Ok(None)` when nobody is waiting.
pub fn accept_source(listener: &TcpListener, nodelay: bool) -> Result<Option<TcpByteSource>> {
    match listener.accept() {
        Ok((stream, peer_addr)) => {
            stream.set_nodelay(nodelay)?;
            let source = TcpByteSource::new(stream)?;
            tracing::info!(%peer_addr, "client connected - MJPEG stream starting");
            Ok(Some(source))
        }
        Err(ref e) if is_transient(e.kind()) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
