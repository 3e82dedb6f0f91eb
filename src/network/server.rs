//! TCP Server
//!
//! Accepts connections and runs each one on its own thread.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::Connection;
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::{AtlasError, Result};
use crate::protocol::{write_reply, Reply};

/// How often the accept loop checks for shutdown when idle
pub const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Cloneable handle that stops a running [`Server`]
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    /// Stop accepting connections; open connections finish on their own
    pub fn shutdown(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_shutdown(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Decrements the live connection count when a connection thread ends
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// TCP server for AtlasID
pub struct Server {
    config: Config,
    dispatcher: Arc<Dispatcher>,

    /// Taken by `run`; dropping it closes the listening socket
    listener: Option<TcpListener>,
    local_addr: SocketAddr,

    shutdown: ShutdownHandle,
    active: Arc<AtomicUsize>,
}

impl Server {
    /// Bind the listening socket
    pub fn bind(config: Config, dispatcher: Arc<Dispatcher>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Listening on {}", local_addr);

        Ok(Self {
            config,
            dispatcher,
            listener: Some(listener),
            local_addr,
            shutdown: ShutdownHandle::default(),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Start the server (blocking until shutdown)
    ///
    /// Accept failures are logged and the loop keeps listening.
    pub fn run(&mut self) -> Result<()> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| AtlasError::Internal("server is already running".to_string()))?;

        while !self.shutdown.is_shutdown() {
            match listener.accept() {
                Ok((stream, addr)) => self.spawn_connection(stream, addr),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::error!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        drop(listener);
        tracing::info!(
            "Listener closed, {} connections still open",
            self.active_connections()
        );
        Ok(())
    }

    fn spawn_connection(&self, stream: TcpStream, addr: SocketAddr) {
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!("Dropping connection from {}: {}", addr, e);
            return;
        }

        if self.active.fetch_add(1, Ordering::AcqRel) >= self.config.max_connections {
            self.active.fetch_sub(1, Ordering::AcqRel);
            tracing::warn!("Rejecting {}: max connections reached", addr);
            let mut stream = stream;
            if let Err(e) = write_reply(&mut stream, &Reply::error("max number of clients reached")) {
                tracing::debug!("Failed to send rejection to {}: {}", addr, e);
            }
            return;
        }

        let guard = ActiveGuard(Arc::clone(&self.active));
        let dispatcher = Arc::clone(&self.dispatcher);
        let (read_ms, write_ms) = (self.config.read_timeout_ms, self.config.write_timeout_ms);

        let spawned = thread::Builder::new()
            .name(format!("conn-{}", addr))
            .spawn(move || {
                let _guard = guard;
                let mut connection = match Connection::new(stream, dispatcher) {
                    Ok(connection) => connection,
                    Err(e) => {
                        tracing::warn!("Failed to set up connection from {}: {}", addr, e);
                        return;
                    }
                };
                if let Err(e) = connection.set_timeouts(read_ms, write_ms) {
                    tracing::warn!("Failed to set timeouts for {}: {}", addr, e);
                }
                if let Err(e) = connection.handle() {
                    tracing::debug!("Connection {} closed: {}", addr, e);
                }
            });

        if let Err(e) = spawned {
            tracing::error!("Failed to spawn connection thread for {}: {}", addr, e);
        }
    }

    /// Handle for stopping the server from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}
