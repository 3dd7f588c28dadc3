//! TCP transport: the background receiver thread, the locked send path, and
//! the foreground client loop that ties them to input and rendering.

use crate::config::ClientConfig;
use crate::dispatch::{dispatch, Outcome};
use crate::game::SharedGameState;
use crate::input::{InputSender, KeyState};
use crate::rendering::Renderer;
use log::{debug, error, info, warn};
use macroquad::prelude::{is_quit_requested, next_frame, prevent_quit};
use parking_lot::Mutex;
use shared::{read_frame, write_frame, FrameError, Packet, PacketError};
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not connect to {addr}: {source}")]
    Connection {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("could not start receiver thread: {0}")]
    Thread(#[source] io::Error),
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error(transparent)]
    Encode(#[from] PacketError),

    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Process-wide stop flag shared by the receiver thread and the foreground loop.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The server closed the stream.
    PeerClosed,
    /// Local shutdown was requested.
    Shutdown,
    /// Reading failed with an unrecoverable error.
    Fatal(String),
}

/// What the receiver thread reports when it stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverExit {
    pub reason: CloseReason,
    /// Frames that changed the store.
    pub frames_applied: u64,
    /// Frames reported in the log without touching the store.
    pub frames_logged: u64,
    pub frames_dropped: u64,
}

/// Reads frames until the stream closes or shutdown is raised, applying each
/// packet to `store` in arrival order. Always raises `shutdown` before returning.
pub fn run_receiver<R: Read>(
    reader: &mut R,
    store: &SharedGameState,
    shutdown: &ShutdownSignal,
) -> ReceiverExit {
    let mut frames_applied = 0;
    let mut frames_logged = 0;
    let mut frames_dropped = 0;

    let reason = loop {
        if shutdown.is_raised() {
            break CloseReason::Shutdown;
        }

        let payload = match read_frame(reader) {
            Ok(payload) => payload,
            // A read unblocked by our own half-close looks like a peer close.
            Err(_) if shutdown.is_raised() => break CloseReason::Shutdown,
            Err(e) if e.is_peer_closed() => {
                info!("Server closed the connection ({})", e);
                break CloseReason::PeerClosed;
            }
            Err(e) => {
                error!("Receive failed: {}", e);
                break CloseReason::Fatal(e.to_string());
            }
        };

        if payload.is_empty() {
            continue;
        }

        match Packet::parse(&payload) {
            Ok(packet) => match dispatch(&packet, store) {
                Outcome::Applied => frames_applied += 1,
                Outcome::Logged => frames_logged += 1,
                Outcome::Ignored => frames_dropped += 1,
            },
            Err(e) => {
                warn!("Dropping frame of {} bytes: {}", payload.len(), e);
                frames_dropped += 1;
            }
        }
    };

    shutdown.raise();
    ReceiverExit {
        reason,
        frames_applied,
        frames_logged,
        frames_dropped,
    }
}

/// Write half of the connection. The lock keeps each frame's prefix and
/// payload together when several callers send at once.
#[derive(Debug)]
pub struct PacketSender<W: Write = TcpStream> {
    writer: Mutex<W>,
}

impl<W: Write> PacketSender<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn send(&self, packet: &Packet) -> Result<(), SendError> {
        let payload = packet.to_bytes()?;
        let mut writer = self.writer.lock();
        write_frame(&mut *writer, &payload)?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

/// An open server connection with its receiver thread running.
pub struct Connection {
    stream: TcpStream,
    sender: PacketSender,
    shutdown: ShutdownSignal,
    receiver: Option<JoinHandle<ReceiverExit>>,
}

impl Connection {
    pub fn connect(
        addr: &str,
        store: SharedGameState,
        shutdown: ShutdownSignal,
    ) -> Result<Self, ClientError> {
        let connection_error = |source: io::Error| ClientError::Connection {
            addr: addr.to_string(),
            source,
        };

        let addrs: Vec<_> = addr.to_socket_addrs().map_err(connection_error)?.collect();
        let stream = TcpStream::connect(&addrs[..]).map_err(connection_error)?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not disable Nagle's algorithm: {}", e);
        }

        let mut reader = stream.try_clone().map_err(connection_error)?;
        let writer = stream.try_clone().map_err(connection_error)?;

        let receiver = {
            let shutdown = shutdown.clone();
            thread::Builder::new()
                .name("net-receiver".to_string())
                .spawn(move || run_receiver(&mut reader, &store, &shutdown))
                .map_err(ClientError::Thread)?
        };

        info!("Connected to {}", addr);
        Ok(Self {
            stream,
            sender: PacketSender::new(writer),
            shutdown,
            receiver: Some(receiver),
        })
    }

    pub fn sender(&self) -> &PacketSender {
        &self.sender
    }

    /// Sends without blocking the caller on failure handling; errors are logged only.
    pub fn send(&self, packet: &Packet) {
        if let Err(e) = self.sender.send(packet) {
            error!("[send] {} failed: {}", packet.kind, e);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_raised()
    }

    /// Raises shutdown, shuts the socket down to wake the receiver, and joins it.
    pub fn close(mut self) -> Option<ReceiverExit> {
        self.shutdown_and_join()
    }

    fn shutdown_and_join(&mut self) -> Option<ReceiverExit> {
        let handle = self.receiver.take()?;

        self.shutdown.raise();
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            // Already gone if the server closed first.
            debug!("Socket shutdown: {}", e);
        }

        match handle.join() {
            Ok(exit) => Some(exit),
            Err(_) => {
                error!("Receiver thread panicked");
                None
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

/// Client context: owns the store, the connection and the per-tick helpers.
pub struct Client {
    config: ClientConfig,
    store: SharedGameState,
    shutdown: ShutdownSignal,
    connection: Connection,
    input: InputSender,
    renderer: Renderer,
}

impl Client {
    pub fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let store = SharedGameState::new();
        let shutdown = ShutdownSignal::new();
        let connection = Connection::connect(&config.server_addr, store.clone(), shutdown.clone())?;

        Ok(Client {
            input: InputSender::new(&config.player_name),
            renderer: Renderer::new(config.width, config.height, &config.player_name),
            config,
            store,
            shutdown,
            connection,
        })
    }

    /// Runs the input/render loop until the window closes or the connection
    /// drops, then tears the connection down.
    pub async fn run(mut self) -> Option<ReceiverExit> {
        prevent_quit();
        let frame_budget = Duration::from_secs_f64(1.0 / self.config.target_fps as f64);

        while !self.shutdown.is_raised() {
            let frame_start = Instant::now();

            if is_quit_requested() {
                info!("Window closed");
                break;
            }

            let event = self.store.with_read(|state| state.assigned_event.clone());
            if let Err(e) =
                self.input
                    .tick(KeyState::sample(), self.connection.sender(), event.as_deref())
            {
                error!("[send] {}", e);
            }

            self.renderer.render(&self.store);
            next_frame().await;

            if let Some(remaining) = frame_budget.checked_sub(frame_start.elapsed()) {
                thread::sleep(remaining);
            }
        }

        info!("Closing connection...");
        let exit = self.connection.close();
        if let Some(exit) = &exit {
            info!(
                "Receiver stopped: {:?} ({} frames applied, {} logged, {} dropped)",
                exit.reason, exit.frames_applied, exit.frames_logged, exit.frames_dropped
            );
        }
        exit
    }
}
