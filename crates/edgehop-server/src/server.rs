//! The server: accept loop, per-connection workers, and lifecycle.
//!
//! `ScreenServer::start` binds the listening socket (retrying while the
//! address is in use), spawns the accept loop, and hands back a handle
//! whose [`dispatcher`](ScreenServer::dispatcher) receives the platform's
//! input callbacks.  Each accepted connection gets its own worker:
//! handshake, registration, info query, then the interpreter until
//! disconnect.  A failing client takes down only itself; the accept loop
//! and every other connection keep running.

use crate::application::dispatch::{Dispatcher, PrimaryScreen};
use crate::application::session::{SessionError, SessionTable};
use crate::infrastructure::network::connection::Connection;
use crate::infrastructure::network::handshake::{negotiate, HANDSHAKE_TIMEOUT};
use crate::infrastructure::network::interpreter::Interpreter;
use crate::infrastructure::network::link::BufferLink;
use crate::infrastructure::network::packet::send_message;
use crate::infrastructure::network::stream::ConnectionBuffers;
use crate::infrastructure::network::NetworkError;
use edgehop_core::domain::topology::ScreenMap;
use edgehop_core::protocol::codec::{validate_catalogue, ProtocolError};
use edgehop_core::protocol::messages::{Message, DEFAULT_PORT};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

/// Delay between bind attempts while the address is in use.
const BIND_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Runtime configuration for one server instance.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The primary screen's name in the topology.
    pub name: String,
    pub bind_address: IpAddr,
    pub port: u16,
    /// Total time to keep retrying a bind that fails with address-in-use.
    pub bind_retry_timeout: Duration,
    pub handshake_timeout: Duration,
    /// See [`crate::infrastructure::storage::config::ServerSection::motion_deadband`].
    pub motion_deadband: i32,
    /// The declared screens and edges.
    pub map: ScreenMap,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "server".to_string(),
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            bind_retry_timeout: Duration::from_secs(300),
            handshake_timeout: HANDSHAKE_TIMEOUT,
            motion_deadband: 32,
            map: ScreenMap::new(),
        }
    }
}

/// Server lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Idle,
    Running,
    ShuttingDown,
}

/// Errors fatal to server startup.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// A running server instance.
pub struct ScreenServer {
    dispatcher: Arc<Dispatcher>,
    local_addr: SocketAddr,
    state: Arc<Mutex<ServerState>>,
    shutdown_tx: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
}

impl ScreenServer {
    /// Validates the catalogue and configuration, binds the listening
    /// socket, and starts accepting clients.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] for an inconsistent message catalogue, an
    /// unusable primary geometry, or a bind failure that outlasted the
    /// retry budget.
    pub async fn start(
        config: ServerConfig,
        primary: Arc<dyn PrimaryScreen>,
    ) -> Result<ScreenServer, ServerError> {
        info!("starting server");
        let state = Arc::new(Mutex::new(ServerState::Idle));

        // Catch a codec-layout mismatch here rather than mid-connection.
        validate_catalogue()?;

        let (width, height) = primary.size();
        let table =
            SessionTable::new(&config.name, width, height, primary.jump_zone(), config.map.clone())?;
        info!("server size={width}x{height} zone={}", primary.jump_zone());
        let dispatcher =
            Arc::new(Dispatcher::new(table, Arc::clone(&primary), config.motion_deadband));

        let addr = SocketAddr::new(config.bind_address, config.port);
        let listener = bind_with_retry(addr, config.bind_retry_timeout).await?;
        let local_addr = listener.local_addr().map_err(NetworkError::Io)?;
        info!("listening on {local_addr}");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let accept_task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&dispatcher),
            config.handshake_timeout,
            shutdown_rx,
        ));

        *state.lock().expect("state lock poisoned") = ServerState::Running;
        Ok(ScreenServer { dispatcher, local_addr, state, shutdown_tx, accept_task })
    }

    /// The dispatcher the platform layer feeds input callbacks into.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Address the server actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> ServerState {
        *self.state.lock().expect("state lock poisoned")
    }

    /// Stops accepting, tells every client goodbye, closes all
    /// connections in the documented order, and waits for every task.
    pub async fn shutdown(self) {
        info!("stopping server");
        *self.state.lock().expect("state lock poisoned") = ServerState::ShuttingDown;
        self.dispatcher.notify_shutdown();
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.accept_task.await {
            warn!("accept loop ended abnormally: {e}");
        }
        info!("server stopped");
    }
}

/// Binds the listener, retrying while the address is in use, up to the
/// configured timeout.
async fn bind_with_retry(
    addr: SocketAddr,
    retry_timeout: Duration,
) -> Result<TcpListener, NetworkError> {
    let started = Instant::now();
    loop {
        debug!("binding listen socket");
        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                if started.elapsed() >= retry_timeout {
                    debug!("waited too long to bind, giving up");
                    return Err(NetworkError::BindFailed { addr, source: e });
                }
                debug!("bind failed; waiting to retry");
                tokio::time::sleep(BIND_RETRY_DELAY).await;
            }
            Err(e) => return Err(NetworkError::BindFailed { addr, source: e }),
        }
    }
}

/// Accepts connections until shutdown, then waits for every worker.
async fn accept_loop(
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    handshake_timeout: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    debug!("waiting for client connections");
    let mut workers = JoinSet::new();
    loop {
        tokio::select! {
            res = listener.accept() => match res {
                Ok((socket, peer)) => {
                    info!("accepted client connection from {peer}");
                    let dispatcher = Arc::clone(&dispatcher);
                    let shutdown_rx = shutdown_rx.clone();
                    workers.spawn(serve_client(socket, dispatcher, handshake_timeout, shutdown_rx));
                }
                // One failed accept (fd exhaustion and friends) must not
                // stop service for everyone else.
                Err(e) => warn!("accept failed: {e}"),
            },
            _ = shutdown_rx.changed() => break,
        }
    }
    debug!("waiting for {} connection worker(s)", workers.len());
    while workers.join_next().await.is_some() {}
    debug!("accept loop finished");
}

/// One connection's whole life: handshake, registration, info query,
/// interpreter, departure, teardown.
async fn serve_client(
    socket: TcpStream,
    dispatcher: Arc<Dispatcher>,
    handshake_timeout: Duration,
    shutdown_rx: watch::Receiver<bool>,
) {
    let conn = match Connection::spawn(socket) {
        Ok(conn) => conn,
        Err(e) => {
            warn!("cannot take over accepted socket: {e}");
            return;
        }
    };
    debug!(conn = %conn.id(), "negotiating with new client");

    let buffers = conn.buffers();
    let mut registered: Option<String> = None;
    match run_session(&buffers, &dispatcher, handshake_timeout, shutdown_rx, &mut registered).await
    {
        Ok(()) => match &registered {
            Some(name) => info!("client \"{name}\" disconnected"),
            None => debug!(conn = %conn.id(), "connection ended before negotiation finished"),
        },
        Err(e) => log_session_error(&registered, &e),
    }

    if let Some(name) = &registered {
        dispatcher.screen_departed(name);
    }
    conn.close().await;
}

/// The post-accept protocol sequence on one connection.
async fn run_session(
    buffers: &Arc<ConnectionBuffers>,
    dispatcher: &Dispatcher,
    handshake_timeout: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
    registered: &mut Option<String>,
) -> Result<(), NetworkError> {
    // Shutdown must also reach workers still mid-greeting.
    let negotiated = tokio::select! {
        res = negotiate(buffers, handshake_timeout) => res?,
        _ = shutdown_rx.changed() => return Ok(()),
    };

    let link = Arc::new(BufferLink::new(Arc::clone(buffers)));
    match dispatcher.register_screen(&negotiated.name, link) {
        Ok(()) => *registered = Some(negotiated.name.clone()),
        Err(SessionError::DuplicateScreen(name)) => {
            send_message(buffers, &Message::NameInUse)?;
            return Err(NetworkError::DuplicateName(name));
        }
        Err(e) => return Err(e.into()),
    }

    debug!("waiting for info for client \"{}\"", negotiated.name);
    send_message(buffers, &Message::QueryInfo)?;

    info!("client \"{}\" is connected", negotiated.name);
    Interpreter::for_version(negotiated.version)
        .run(&negotiated.name, buffers, dispatcher, shutdown_rx)
        .await
}

/// One log line per failure class (§ error taxonomy); none are silent.
fn log_session_error(registered: &Option<String>, e: &NetworkError) {
    let who = registered.as_deref().unwrap_or("<unknown>");
    match e {
        NetworkError::IncompatibleVersion { version } => {
            warn!("client \"{who}\" has incompatible version {version}");
        }
        NetworkError::DuplicateName(name) => {
            warn!("client name \"{name}\" is already in use");
        }
        NetworkError::HandshakeTimeout | NetworkError::ClosedDuringHandshake => {
            warn!("client \"{who}\" failed to complete the handshake: {e}");
        }
        NetworkError::Protocol(_)
        | NetworkError::UnexpectedMessage { .. }
        | NetworkError::FrameTooLarge { .. }
        | NetworkError::HelloTooLong { .. }
        | NetworkError::Session(_) => {
            warn!("protocol error from client \"{who}\": {e}");
        }
        NetworkError::Io(_) | NetworkError::BindFailed { .. } => {
            warn!("error communicating with client \"{who}\": {e}");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
