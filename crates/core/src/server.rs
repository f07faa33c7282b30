use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{Result, StreamError};
use crate::media::{Decoder, Renderer};
use crate::session::{SessionConfig, SessionState, StatsReport, StreamSession};
use crate::transport::tcp::{self, TcpByteSource};

/// Well-known port MJPEG senders connect to.
pub const DEFAULT_PORT: u16 = 8090;

/// Receiver-level configuration.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Address to listen on (host:port).
    pub bind_addr: String,
    /// Sleep between cycles that moved no data.
    pub poll_interval: Duration,
    /// Disable Nagle's algorithm on accepted connections.
    pub nodelay: bool,
    pub session: SessionConfig,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{DEFAULT_PORT}"),
            poll_interval: Duration::from_millis(1),
            nodelay: true,
            session: SessionConfig::default(),
        }
    }
}

/// Snapshot of the driving loop, published after every cycle.
#[derive(Debug, Clone, Default)]
pub struct ReceiverStatus {
    pub state: SessionState,
    /// Sender of the current stream, if connected.
    pub peer_addr: Option<SocketAddr>,
    /// Frames decoded since the receiver started.
    pub total_frames: u64,
    pub last_report: Option<StatsReport>,
}

/// TCP front end for a [`StreamSession`].
///
/// [`start`](Self::start) binds a non-blocking listener and spawns one
/// thread that owns the session outright. That thread alternates between
/// accepting a sender (while idle) and driving the session. One stream is
/// served at a time; further senders wait in the listen backlog.
pub struct Receiver {
    config: ReceiverConfig,
    running: Arc<AtomicBool>,
    status: Arc<Mutex<ReceiverStatus>>,
    local_addr: Option<SocketAddr>,
    worker: Option<JoinHandle<()>>,
}

impl Receiver {
    pub fn new(bind_addr: &str) -> Self {
        Self::with_config(ReceiverConfig {
            bind_addr: bind_addr.to_string(),
            ..ReceiverConfig::default()
        })
    }

    pub fn with_config(config: ReceiverConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            status: Arc::new(Mutex::new(ReceiverStatus::default())),
            local_addr: None,
            worker: None,
        }
    }

    /// Allocate the session, bind the listener and start the driving loop.
    ///
    /// Buffer allocation and bind failures are returned here; nothing is
    /// left running when this fails.
    pub fn start<D, R>(&mut self, decoder: D, renderer: R) -> Result<SocketAddr>
    where
        D: Decoder + Send + 'static,
        R: Renderer<D::Output> + Send + 'static,
    {
        if self.running.load(Ordering::SeqCst) {
            return Err(StreamError::AlreadyRunning);
        }

        let mut session: StreamSession<TcpByteSource, D, R> =
            StreamSession::new(self.config.session.clone(), decoder, renderer)?;

        let listener = TcpListener::bind(&self.config.bind_addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        session.set_listen_addr(local_addr);
        session.show_waiting();

        *self.status.lock() = ReceiverStatus::default();
        self.running.store(true, Ordering::SeqCst);

        let ctx = DriveLoop {
            listener,
            running: self.running.clone(),
            status: self.status.clone(),
            poll_interval: self.config.poll_interval,
            nodelay: self.config.nodelay,
        };

        let worker = thread::Builder::new()
            .name("mjpeg-drive".to_string())
            .spawn(move || ctx.run(session));
        let worker = match worker {
            Ok(handle) => handle,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        };

        tracing::info!(
            bind = %self.config.bind_addr,
            addr = %local_addr,
            "MJPEG receiver listening"
        );

        self.local_addr = Some(local_addr);
        self.worker = Some(worker);
        Ok(local_addr)
    }

    /// Stop the driving loop and wait for it to exit.
    pub fn stop(&mut self) -> Result<()> {
        let worker = self.worker.take().ok_or(StreamError::NotStarted)?;
        self.running.store(false, Ordering::SeqCst);
        tracing::info!("receiver stopping");
        if worker.join().is_err() {
            tracing::error!("drive loop panicked");
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Address the listener is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn status(&self) -> ReceiverStatus {
        self.status.lock().clone()
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.stop();
        }
    }
}

/// State moved onto the driving thread.
struct DriveLoop {
    listener: TcpListener,
    running: Arc<AtomicBool>,
    status: Arc<Mutex<ReceiverStatus>>,
    poll_interval: Duration,
    nodelay: bool,
}

impl DriveLoop {
    fn run<D, R>(self, mut session: StreamSession<TcpByteSource, D, R>)
    where
        D: Decoder,
        R: Renderer<D::Output>,
    {
        while self.running.load(Ordering::SeqCst) {
            if session.is_idle() {
                match tcp::accept_source(&self.listener, self.nodelay) {
                    Ok(Some(source)) => session.accept(source),
                    Ok(None) => {}
                    Err(e) => tracing::warn!(error = %e, "TCP accept error"),
                }
            }

            let cycle = session.drive();
            self.publish(&session);

            if !cycle.made_progress() {
                thread::sleep(self.poll_interval);
            }
        }

        if !session.is_idle() {
            session.disconnect();
            self.publish(&session);
        }
        tracing::debug!("drive loop exited");
    }

    fn publish<D, R>(&self, session: &StreamSession<TcpByteSource, D, R>) {
        let mut status = self.status.lock();
        status.state = session.state();
        status.peer_addr = session.source().map(TcpByteSource::peer_addr);
        status.total_frames = session.total_frames();
        if let Some(report) = session.last_report() {
            status.last_report = Some(report.clone());
        }
    }
}
