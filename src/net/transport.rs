//! Frame transports
//!
//! A transport moves whole frames between peers and reports connects and
//! disconnects. Neither direction blocks the caller: sends are queued, and
//! I/O tasks push received frames into a queue that the simulation thread
//! drains through [`Transport::poll`].

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::runtime::{Handle, Runtime};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::wire::FRAME_LEN;
use crate::error::{NetResult, TransportError};

pub type PeerId = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected(PeerId),
    Disconnected(PeerId),
    Frame(PeerId, Vec<u8>),
}

pub trait Transport {
    /// Queue one frame for a peer. Never blocks.
    fn send(&mut self, peer: PeerId, frame: &[u8]) -> NetResult<()>;

    /// Currently connected peers, in id order
    fn peers(&self) -> Vec<PeerId>;

    /// Next pending event, if any. Never blocks.
    fn poll(&mut self) -> Option<TransportEvent>;

    /// Drop every connection
    fn close(&mut self);
}

/// In-process transport over channels. Endpoints are wired with [`link`].
#[derive(Debug)]
pub struct ChannelTransport {
    id: PeerId,
    peers: HashMap<PeerId, UnboundedSender<TransportEvent>>,
    inbox: UnboundedReceiver<TransportEvent>,
    inbox_tx: UnboundedSender<TransportEvent>,
}

impl ChannelTransport {
    /// `id` is how other endpoints will see this one
    pub fn new(id: PeerId) -> Self {
        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        Self {
            id,
            peers: HashMap::new(),
            inbox,
            inbox_tx,
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }
}

/// Connect two endpoints. Both see a `Connected` event on their next poll.
pub fn link(a: &mut ChannelTransport, b: &mut ChannelTransport) {
    a.peers.insert(b.id, b.inbox_tx.clone());
    b.peers.insert(a.id, a.inbox_tx.clone());
    // Inboxes are owned by the endpoints themselves, so these cannot fail
    let _ = a.inbox_tx.send(TransportEvent::Connected(b.id));
    let _ = b.inbox_tx.send(TransportEvent::Connected(a.id));
}

impl Transport for ChannelTransport {
    fn send(&mut self, peer: PeerId, frame: &[u8]) -> NetResult<()> {
        let tx = self
            .peers
            .get(&peer)
            .ok_or(TransportError::UnknownPeer(peer))?;
        tx.send(TransportEvent::Frame(self.id, frame.to_vec()))
            .map_err(|_| TransportError::Closed)
    }

    fn peers(&self) -> Vec<PeerId> {
        let mut peers: Vec<_> = self.peers.keys().copied().collect();
        peers.sort_unstable();
        peers
    }

    fn poll(&mut self) -> Option<TransportEvent> {
        let event = self.inbox.try_recv().ok()?;
        if let TransportEvent::Disconnected(peer) = event {
            self.peers.remove(&peer);
        }
        Some(event)
    }

    fn close(&mut self) {
        for (_, tx) in self.peers.drain() {
            let _ = tx.send(TransportEvent::Disconnected(self.id));
        }
    }
}

/// Pause after a failed accept before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// How long `close` waits for queued frames to reach each peer
const FLUSH_TIMEOUT: Duration = Duration::from_millis(250);

/// Outbound half of one connection
#[derive(Debug)]
struct PeerLink {
    frames: UnboundedSender<Vec<u8>>,
    writer: JoinHandle<()>,
}

type Writers = Arc<Mutex<HashMap<PeerId, PeerLink>>>;

/// TCP transport on a private tokio runtime, one reader and one writer task
/// per connection
#[derive(Debug)]
pub struct TcpTransport {
    runtime: Option<Runtime>,
    inbox: UnboundedReceiver<TransportEvent>,
    writers: Writers,
    closing: watch::Sender<bool>,
    local_addr: SocketAddr,
}

fn build_runtime() -> NetResult<Runtime> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("kickoff-net")
        .enable_all()
        .build()?;
    Ok(runtime)
}

impl TcpTransport {
    /// Accept connections on `addr`
    pub fn listen(addr: impl ToSocketAddrs) -> NetResult<Self> {
        let runtime = build_runtime()?;
        let listener = runtime.block_on(TcpListener::bind(addr))?;
        let local_addr = listener.local_addr()?;
        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        let (closing, closed) = watch::channel(false);
        let writers = Writers::default();

        runtime.spawn(accept_loop(
            listener,
            Arc::clone(&writers),
            inbox_tx,
            closed,
        ));

        log::info!("Listening on {}", local_addr);
        Ok(Self {
            runtime: Some(runtime),
            inbox,
            writers,
            closing,
            local_addr,
        })
    }

    /// Connect to a listening host. The host is peer 0.
    pub fn connect(addr: impl ToSocketAddrs) -> NetResult<Self> {
        let runtime = build_runtime()?;
        let stream = runtime.block_on(TcpStream::connect(addr))?;
        let local_addr = stream.local_addr()?;
        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        let (closing, closed) = watch::channel(false);
        let writers = Writers::default();
        register(runtime.handle(), stream, 0, &writers, &inbox_tx, closed)?;
        Ok(Self {
            runtime: Some(runtime),
            inbox,
            writers,
            closing,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

async fn accept_loop(
    listener: TcpListener,
    writers: Writers,
    inbox_tx: UnboundedSender<TransportEvent>,
    mut closed: watch::Receiver<bool>,
) {
    let mut next_id: PeerId = 1;
    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = closed.changed() => break,
        };
        match accepted {
            Ok((stream, remote)) => {
                let id = next_id;
                next_id += 1;
                log::info!("Peer {} connected from {}", id, remote);
                let handle = Handle::current();
                if let Err(e) = register(&handle, stream, id, &writers, &inbox_tx, closed.clone()) {
                    log::warn!("Failed to set up peer {}: {}", id, e);
                }
            }
            Err(e) => {
                log::warn!("Accept failed: {}", e);
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}

/// Start the reader and writer tasks for one connection
fn register(
    handle: &Handle,
    stream: TcpStream,
    id: PeerId,
    writers: &Writers,
    inbox_tx: &UnboundedSender<TransportEvent>,
    mut closed: watch::Receiver<bool>,
) -> NetResult<()> {
    stream.set_nodelay(true)?;
    let (mut reader, mut writer) = stream.into_split();

    let (frames, mut outbound) = mpsc::unbounded_channel::<Vec<u8>>();
    let writer = handle.spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if let Err(e) = writer.write_all(&frame).await {
                log::debug!("Write to peer {} failed: {}", id, e);
                break;
            }
        }
        let _ = writer.shutdown().await;
    });
    writers
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(id, PeerLink { frames, writer });
    let _ = inbox_tx.send(TransportEvent::Connected(id));

    let writers = Arc::clone(writers);
    let inbox_tx = inbox_tx.clone();
    handle.spawn(async move {
        let mut buf = [0u8; FRAME_LEN];
        loop {
            let read = tokio::select! {
                read = reader.read_exact(&mut buf) => read,
                _ = closed.changed() => break,
            };
            if read.is_err() || inbox_tx.send(TransportEvent::Frame(id, buf.to_vec())).is_err() {
                break;
            }
        }
        // Dropping the link ends the writer task
        writers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        let _ = inbox_tx.send(TransportEvent::Disconnected(id));
    });
    Ok(())
}

impl Transport for TcpTransport {
    fn send(&mut self, peer: PeerId, frame: &[u8]) -> NetResult<()> {
        let writers = self.writers.lock().unwrap_or_else(PoisonError::into_inner);
        let link = writers
            .get(&peer)
            .ok_or(TransportError::UnknownPeer(peer))?;
        link.frames
            .send(frame.to_vec())
            .map_err(|_| TransportError::Closed)
    }

    fn peers(&self) -> Vec<PeerId> {
        let writers = self.writers.lock().unwrap_or_else(PoisonError::into_inner);
        let mut peers: Vec<_> = writers.keys().copied().collect();
        peers.sort_unstable();
        peers
    }

    fn poll(&mut self) -> Option<TransportEvent> {
        self.inbox.try_recv().ok()
    }

    fn close(&mut self) {
        let links: Vec<PeerLink> = self
            .writers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, link)| link)
            .collect();
        // Closing each queue lets its writer flush and shut the socket down
        let flushing: Vec<JoinHandle<()>> = links.into_iter().map(|link| link.writer).collect();
        if let Some(runtime) = &self.runtime {
            runtime.block_on(async {
                for writer in flushing {
                    let _ = tokio::time::timeout(FLUSH_TIMEOUT, writer).await;
                }
            });
        }
        let _ = self.closing.send(true);
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.close();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
