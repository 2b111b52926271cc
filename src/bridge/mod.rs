//! Transport bridge: the TCP channel to the remote runtime.
//!
//! The bridge binds a nonblocking listener before the runtime is launched,
//! adopts the first connection as its single peer, ships completed
//! statements out as JSON lines, and decodes the runtime's lifecycle
//! signals from the inbound stream. Raw fds are exposed so the session
//! loop can include the listener and the peer in its poll set.

pub mod protocol;

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::os::fd::AsRawFd;

use crate::log::{log_info, log_warn};
use protocol::{BridgeError, Outbound, RuntimeSignal};

/// Lifecycle events surfaced to the session loop.
#[derive(Debug, PartialEq)]
pub enum BridgeEvent {
    /// The runtime is accepting statements.
    Ready,
    /// The runtime is gone. Fatal for the session.
    Terminated { diagnostic: String },
}

/// Single-peer TCP bridge to the remote runtime.
pub struct Bridge {
    listener: TcpListener,
    peer: Option<TcpStream>,
    inbound: Vec<u8>,
}

impl Bridge {
    /// Bind the bridge listener. Must succeed before the runtime is
    /// launched so the runtime always has something to connect to.
    pub fn listen(addr: &str) -> Result<Self, BridgeError> {
        let listener = TcpListener::bind(addr).map_err(|source| BridgeError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        listener.set_nonblocking(true)?;
        log_info("bridge", "listen", &format!("listening on {}", addr));

        Ok(Self {
            listener,
            peer: None,
            inbound: Vec::new(),
        })
    }

    /// Port the listener actually bound (resolves a `:0` bind).
    pub fn port(&self) -> u16 {
        self.listener
            .local_addr()
            .map(|a| a.port())
            .unwrap_or_default()
    }

    pub fn listener_raw_fd(&self) -> i32 {
        self.listener.as_raw_fd()
    }

    pub fn peer_raw_fd(&self) -> Option<i32> {
        self.peer.as_ref().map(|s| s.as_raw_fd())
    }

    pub fn has_peer(&self) -> bool {
        self.peer.is_some()
    }

    /// Accept pending connections. The first becomes the peer; the
    /// single-peer topology makes later attempts a mistake, so they are
    /// logged and dropped.
    pub fn accept(&mut self) -> Result<(), BridgeError> {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if self.peer.is_some() {
                        log_warn(
                            "bridge",
                            "accept.extra_peer",
                            &format!("dropping second connection from {}", addr),
                        );
                        continue;
                    }
                    stream.set_nonblocking(true)?;
                    log_info(
                        "bridge",
                        "accept.peer",
                        &format!("runtime connected from {}", addr),
                    );
                    self.peer = Some(stream);
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Fire-and-forget dispatch of one completed statement. No
    /// acknowledgement is awaited; the runtime streams its evaluation
    /// output independently.
    pub fn submit(&mut self, source: &str) -> Result<(), BridgeError> {
        let peer = self.peer.as_mut().ok_or(BridgeError::NotConnected)?;
        let mut line = serde_json::to_vec(&Outbound::Statement { source })?;
        line.push(b'\n');
        write_all(peer, &line)?;
        Ok(())
    }

    /// Drain readable peer data and decode buffered lines into lifecycle
    /// events, in arrival order.
    ///
    /// EOF or a hard read error is folded into a trailing synthesized
    /// Terminated event: from the session's point of view the runtime is
    /// gone either way. Any terminated message the runtime managed to send
    /// first still comes out ahead of the synthesized one.
    pub fn read_events(&mut self) -> Vec<BridgeEvent> {
        let Some(peer) = self.peer.as_mut() else {
            return Vec::new();
        };

        let mut closed: Option<String> = None;
        let mut buf = [0u8; 8192];
        loop {
            match peer.read(&mut buf) {
                Ok(0) => {
                    closed = Some("runtime closed the connection".to_string());
                    break;
                }
                Ok(n) => self.inbound.extend_from_slice(&buf[..n]),
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    closed = Some(format!("runtime connection error: {}", e));
                    break;
                }
            }
        }

        let mut events = self.decode_buffered();
        if let Some(diagnostic) = closed {
            self.peer = None;
            events.push(BridgeEvent::Terminated { diagnostic });
        }
        events
    }

    /// Decode complete newline-terminated lines out of the inbound buffer.
    /// A trailing partial line stays buffered for the next read.
    fn decode_buffered(&mut self) -> Vec<BridgeEvent> {
        let mut events = Vec::new();
        while let Some(pos) = self.inbound.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.inbound.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<RuntimeSignal>(line) {
                Ok(RuntimeSignal::Ready) => events.push(BridgeEvent::Ready),
                Ok(RuntimeSignal::Terminated { diagnostic }) => {
                    events.push(BridgeEvent::Terminated { diagnostic });
                }
                Ok(RuntimeSignal::Unknown) => {
                    log_warn("bridge", "decode.unknown_type", line);
                }
                Err(e) => {
                    log_warn("bridge", "decode.bad_line", &format!("{}: {}", e, line));
                }
            }
        }
        events
    }
}

/// Write the whole buffer to a nonblocking stream, spinning briefly on
/// EAGAIN. Statement payloads are small; a full socket buffer here means
/// the runtime has stopped draining, which the next read surfaces.
fn write_all(stream: &mut TcpStream, data: &[u8]) -> Result<(), BridgeError> {
    let mut written = 0;
    while written < data.len() {
        match stream.write(&data[written..]) {
            Ok(n) => written += n,
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => continue,
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
