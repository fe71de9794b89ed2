use crate::bridge::Bridge;
use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{CallError, ServerError};
use crate::protocol::{codec, ResponseEnvelope};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::collections::HashMap;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tungstenite::handshake::HandshakeError;
use tungstenite::protocol::Message;
use tungstenite::WebSocket;

const ACCEPT_POLL: Duration = Duration::from_millis(25);
const SESSION_ID_LEN: usize = 12;
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Asks the server to stop once the current response has been written.
#[derive(Clone, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

struct Inner {
    config: ServerConfig,
    local_addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    bridge: Bridge,
    stop_handle: StopHandle,
    stopped: AtomicBool,
    /// Cloned socket handles, used only to shut sessions down from `stop`.
    sockets: Mutex<HashMap<String, TcpStream>>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

pub struct Server {
    inner: Arc<Inner>,
    listener: Mutex<Option<TcpListener>>,
}

impl Server {
    /// Binds the listening socket. No connection is accepted before
    /// [`Server::serve`].
    pub fn bind(
        config: ServerConfig,
        dispatcher: Arc<Dispatcher>,
        bridge: Bridge,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.addr).map_err(|source| ServerError::Bind {
            addr: config.addr.clone(),
            source,
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                local_addr,
                dispatcher,
                bridge,
                stop_handle: StopHandle::default(),
                stopped: AtomicBool::new(false),
                sockets: Mutex::new(HashMap::new()),
                threads: Mutex::new(Vec::new()),
            }),
            listener: Mutex::new(Some(listener)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.inner.stop_handle.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Starts accepting connections on a background thread. Calling it
    /// again has no effect.
    pub fn serve(&self) -> Result<(), ServerError> {
        let listener = match self.listener.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        let Some(listener) = listener else {
            return Ok(());
        };
        tracing::info!(addr = %self.inner.local_addr, "listening");

        let inner = Arc::clone(&self.inner);
        let handle = thread::Builder::new()
            .name("xfl-accept".to_string())
            .spawn(move || accept_loop(inner, listener))?;
        self.inner.track(handle);
        Ok(())
    }

    /// Stops accepting, closes every session and stops the bridge.
    /// Calling it again is a no-op.
    pub fn stop(&self) {
        self.inner.stop();
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Inner {
    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn track(&self, handle: JoinHandle<()>) {
        if let Ok(mut threads) = self.threads.lock() {
            threads.retain(|h| !h.is_finished());
            threads.push(handle);
        }
    }

    fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!(addr = %self.local_addr, "stopping");

        self.bridge.stop();

        // Only the read half is shut down: a session released from the
        // bridge still writes its `server_stopping` reply.
        let sockets: Vec<TcpStream> = match self.sockets.lock() {
            Ok(mut sockets) => sockets.drain().map(|(_, s)| s).collect(),
            Err(_) => Vec::new(),
        };
        for socket in &sockets {
            let _ = socket.shutdown(Shutdown::Read);
        }

        let threads: Vec<JoinHandle<()>> = match self.threads.lock() {
            Ok(mut threads) => threads.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        let current = thread::current().id();
        for handle in threads {
            // A session may be the one stopping the server.
            if handle.thread().id() != current {
                let _ = handle.join();
            }
        }
        for socket in sockets {
            let _ = socket.shutdown(Shutdown::Both);
        }
        tracing::info!("stopped");
    }
}

fn accept_loop(inner: Arc<Inner>, listener: TcpListener) {
    while !inner.is_stopped() {
        match listener.accept() {
            Ok((stream, peer)) => {
                if inner.is_stopped() {
                    break;
                }
                if let Err(e) = open_session(&inner, stream, peer) {
                    tracing::warn!(%peer, error = %e, "session setup failed");
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                thread::sleep(ACCEPT_POLL);
            }
        }
    }
    tracing::debug!("accept loop finished");
}

fn open_session(inner: &Arc<Inner>, stream: TcpStream, peer: SocketAddr) -> Result<(), ServerError> {
    stream.set_nonblocking(false)?;
    let _ = stream.set_nodelay(true);
    stream.set_read_timeout(Some(inner.config.read_timeout))?;
    stream.set_write_timeout(Some(inner.config.write_timeout))?;

    let id: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect();

    let shutdown_handle = stream.try_clone()?;
    if let Ok(mut sockets) = inner.sockets.lock() {
        sockets.insert(id.clone(), shutdown_handle);
    }
    // `stop` sets the flag before draining `sockets`, so a stop that missed
    // this socket is visible here.
    if inner.is_stopped() {
        if let Ok(mut sockets) = inner.sockets.lock() {
            sockets.remove(&id);
        }
        let _ = stream.shutdown(Shutdown::Both);
        tracing::debug!(%peer, "connection refused, server stopping");
        return Ok(());
    }

    let session_inner = Arc::clone(inner);
    let session_id = id.clone();
    let spawned = thread::Builder::new()
        .name(format!("xfl-session-{id}"))
        .spawn(move || {
            if let Err(e) = run_session(&session_inner, &session_id, stream, peer) {
                tracing::debug!(session = %session_id, error = %e, "session ended with error");
            }
            if let Ok(mut sockets) = session_inner.sockets.lock() {
                sockets.remove(&session_id);
            }
        });

    match spawned {
        Ok(handle) => {
            inner.track(handle);
            Ok(())
        }
        Err(e) => {
            if let Ok(mut sockets) = inner.sockets.lock() {
                sockets.remove(&id);
            }
            Err(e.into())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Open,
    Reading,
    Dispatching,
    Responding,
    Closing,
    Closed,
}

struct Session<'a> {
    id: &'a str,
    state: SessionState,
}

impl Session<'_> {
    fn enter(&mut self, next: SessionState) {
        tracing::trace!(session = %self.id, from = ?self.state, to = ?next, "session state");
        self.state = next;
    }
}

fn run_session(
    inner: &Inner,
    id: &str,
    stream: TcpStream,
    peer: SocketAddr,
) -> Result<(), ServerError> {
    let mut ws = handshake(inner, stream)?;

    let mut session = Session {
        id,
        state: SessionState::Open,
    };
    tracing::debug!(session = %id, %peer, "session opened");

    session.enter(SessionState::Reading);
    let outcome = serve_requests(inner, &mut session, &mut ws);

    session.enter(SessionState::Closing);
    let _ = ws.close(None);
    let _ = ws.flush();
    session.enter(SessionState::Closed);
    tracing::debug!(session = %id, %peer, "session closed");
    outcome
}

/// Completes the server handshake. Read timeouts interrupt it so that a
/// stop or a silent peer cannot hold the session thread.
fn handshake(inner: &Inner, stream: TcpStream) -> Result<WebSocket<TcpStream>, ServerError> {
    let deadline = Instant::now() + HANDSHAKE_TIMEOUT;
    let mut attempt = tungstenite::accept(stream);
    loop {
        match attempt {
            Ok(ws) => return Ok(ws),
            Err(HandshakeError::Interrupted(mid)) => {
                if inner.is_stopped() {
                    return Err(ServerError::Handshake("server stopping".to_string()));
                }
                if Instant::now() >= deadline {
                    return Err(ServerError::Handshake("handshake timed out".to_string()));
                }
                attempt = mid.handshake();
            }
            Err(HandshakeError::Failure(e)) => return Err(ServerError::Handshake(e.to_string())),
        }
    }
}

fn serve_requests(
    inner: &Inner,
    session: &mut Session<'_>,
    ws: &mut WebSocket<TcpStream>,
) -> Result<(), ServerError> {
    loop {
        if inner.is_stopped() {
            return Ok(());
        }

        let bytes = match ws.read() {
            Ok(Message::Binary(bytes)) => bytes,
            Ok(Message::Text(_)) => {
                tracing::warn!(session = %session.id, "text frame, closing session");
                return Ok(());
            }
            Ok(Message::Close(_)) => return Ok(()),
            // Pings are answered by tungstenite on the next read or write.
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => continue,
            Err(tungstenite::Error::Io(e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue
            }
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                return Ok(())
            }
            Err(e) => return Err(e.into()),
        };

        session.enter(SessionState::Dispatching);
        let req = match codec::decode_request(&bytes) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!(session = %session.id, error = %e, "undecodable request, closing session");
                return Ok(());
            }
        };
        tracing::debug!(
            session = %session.id,
            call_id = req.call_id,
            procedure = %req.procedure,
            "dispatch"
        );
        let resp = inner.dispatcher.dispatch(&req);

        session.enter(SessionState::Responding);
        let payload = encode_or_report(resp)?;
        ws.send(Message::binary(payload))?;

        if inner.stop_handle.is_requested() {
            inner.stop();
            return Ok(());
        }
        session.enter(SessionState::Reading);
    }
}

/// A result that cannot be encoded is answered with an `encode_error`
/// for the same call.
fn encode_or_report(resp: ResponseEnvelope) -> Result<Vec<u8>, ServerError> {
    match codec::encode_response(&resp) {
        Ok(bytes) => Ok(bytes),
        Err(e) => {
            tracing::warn!(call_id = resp.call_id, error = %e, "response not encodable");
            let fallback = ResponseEnvelope {
                call_id: resp.call_id,
                outcome: Err(CallError::from(e).to_wire()),
            };
            Ok(codec::encode_response(&fallback)?)
        }
    }
}
