//! Unix domain socket server for IPC
//!
//! Provides request-response communication and push notifications of
//! gesture events to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::events::GestureEvent;
use crate::lifecycle::ShutdownSignal;

use super::protocol::{DaemonStatus, Request, Response, MAX_MESSAGE_LEN};

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    shared: Arc<Shared>,
    shutdown_tx: broadcast::Sender<()>,
}

/// Handles the daemon exposes to clients
pub struct Controls {
    /// Pause flag read by the detection session
    pub paused: Arc<AtomicBool>,
    /// Triggered by a client shutdown request
    pub shutdown: ShutdownSignal,
    /// Source of notifications for subscribed clients
    pub event_tx: broadcast::Sender<GestureEvent>,
}

/// State shared by all client handlers
struct Shared {
    state: RwLock<ServerState>,
    controls: Controls,
}

struct ServerState {
    status: DaemonStatus,
    start_time: Instant,
}

impl Shared {
    fn new(hold_threshold: Duration, controls: Controls) -> Self {
        let status = DaemonStatus {
            hold_threshold_ms: hold_threshold.as_millis() as u64,
            ..DaemonStatus::default()
        };

        Self {
            state: RwLock::new(ServerState {
                status,
                start_time: Instant::now(),
            }),
            controls,
        }
    }
}

impl Server {
    /// Create a new IPC server
    pub fn new(socket_path: &Path, hold_threshold: Duration, controls: Controls) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            shared: Arc::new(Shared::new(hold_threshold, controls)),
            shutdown_tx,
        })
    }

    /// Fold a pipeline event into the status snapshot
    pub async fn record_event(&self, event: &GestureEvent) {
        let mut state = self.shared.state.write().await;
        state.status.apply(event);
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let shared = Arc::clone(&self.shared);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, shared) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    ///
    /// Requests are read on their own task so that a half-read message is
    /// never lost when a notification is pushed.
    async fn handle_client(stream: UnixStream, shared: Arc<Shared>) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let (request_tx, mut request_rx) = mpsc::channel(8);
        let reader_task = tokio::spawn(read_requests(reader, request_tx));

        let mut events: Option<broadcast::Receiver<GestureEvent>> = None;

        let result = loop {
            tokio::select! {
                request = request_rx.recv() => {
                    let response = match request {
                        Some(Ok(request)) => {
                            debug!(?request, "received request");
                            let (response, subscribe) =
                                Self::process_request(request, &shared).await;
                            if subscribe && events.is_none() {
                                debug!("client subscribed to notifications");
                                events = Some(shared.controls.event_tx.subscribe());
                            }
                            response
                        }
                        Some(Err(message)) => Response::Error {
                            code: "bad_request".to_string(),
                            message,
                        },
                        None => break Ok(()),
                    };

                    if let Err(e) = send_message(&mut writer, &response).await {
                        break Err(e);
                    }
                }

                event = next_event(&mut events) => {
                    match event {
                        Ok(event) => {
                            let notification = Response::Notification { event };
                            if let Err(e) = send_message(&mut writer, &notification).await {
                                break Err(e);
                            }
                        }
                        Err(RecvError::Lagged(n)) => {
                            warn!(skipped = n, "subscriber lagged");
                        }
                        Err(RecvError::Closed) => {
                            events = None;
                        }
                    }
                }
            }
        };

        reader_task.abort();
        result
    }

    /// Process a request and return a response
    /// Returns (Response, should_subscribe)
    async fn process_request(request: Request, shared: &Shared) -> (Response, bool) {
        let controls = &shared.controls;

        match request {
            Request::Ping => (Response::Pong, false),

            Request::GetStatus => {
                let state = shared.state.read().await;
                let mut status = state.status.clone();
                status.uptime_secs = state.start_time.elapsed().as_secs();
                status.paused = controls.paused.load(Ordering::SeqCst);
                (Response::Status(status), false)
            }

            Request::Pause => {
                if !controls.paused.swap(true, Ordering::SeqCst) {
                    info!("detection paused via IPC");
                    let _ = controls.event_tx.send(GestureEvent::DetectionPaused);
                }
                (Response::Ack, false)
            }

            Request::Resume => {
                if controls.paused.swap(false, Ordering::SeqCst) {
                    info!("detection resumed via IPC");
                    let _ = controls.event_tx.send(GestureEvent::DetectionResumed);
                }
                (Response::Ack, false)
            }

            Request::Subscribe => (Response::Subscribed, true),

            Request::Shutdown => {
                info!("shutdown requested via IPC");
                controls.shutdown.trigger();
                (Response::Ack, false)
            }
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Read length-prefixed requests until the client disconnects
///
/// Unparsable bodies are forwarded as errors so the client gets a reply.
async fn read_requests<R>(mut reader: R, request_tx: mpsc::Sender<Result<Request, String>>)
where
    R: AsyncRead + Unpin,
{
    loop {
        let body = match read_message(&mut reader).await {
            Ok(Some(body)) => body,
            Ok(None) => {
                debug!("client disconnected");
                return;
            }
            Err(e) => {
                warn!(?e, "failed to read request, disconnecting");
                return;
            }
        };

        let request = serde_json::from_slice(&body).map_err(|e| e.to_string());
        if request_tx.send(request).await.is_err() {
            return;
        }
    }
}

/// Read one length-prefixed message body; `None` on clean EOF
async fn read_message<R>(reader: &mut R) -> Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    anyhow::ensure!(len <= MAX_MESSAGE_LEN, "message too large: {len} bytes");

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

/// Send a length-prefixed JSON message
async fn send_message<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: serde::Serialize,
{
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;

    Ok(())
}

/// Next event for a subscribed client; never resolves when unsubscribed
async fn next_event(
    events: &mut Option<broadcast::Receiver<GestureEvent>>,
) -> Result<GestureEvent, RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::Gesture;

    fn controls() -> (Controls, Arc<AtomicBool>, broadcast::Sender<GestureEvent>) {
        let paused = Arc::new(AtomicBool::new(false));
        let (event_tx, _) = broadcast::channel(16);
        let controls = Controls {
            paused: Arc::clone(&paused),
            shutdown: ShutdownSignal::new(),
            event_tx: event_tx.clone(),
        };
        (controls, paused, event_tx)
    }

    async fn request<S>(stream: &mut S, request: &Request) -> Response
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        send_message(stream, request).await.unwrap();
        receive(stream).await
    }

    async fn receive<S>(stream: &mut S) -> Response
    where
        S: AsyncRead + Unpin,
    {
        let body = read_message(stream).await.unwrap().unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_process_requests() {
        let (controls, paused, _tx) = controls();
        let shared = Shared::new(Duration::from_millis(1500), controls);

        let (resp, subscribe) = Server::process_request(Request::Ping, &shared).await;
        assert_eq!(resp, Response::Pong);
        assert!(!subscribe);

        let (resp, _) = Server::process_request(Request::Pause, &shared).await;
        assert_eq!(resp, Response::Ack);
        assert!(paused.load(Ordering::SeqCst));

        match Server::process_request(Request::GetStatus, &shared).await {
            (Response::Status(status), false) => {
                assert!(status.paused);
                assert_eq!(status.hold_threshold_ms, 1500);
            }
            other => panic!("unexpected response {:?}", other),
        }

        Server::process_request(Request::Resume, &shared).await;
        assert!(!paused.load(Ordering::SeqCst));

        let (resp, subscribe) = Server::process_request(Request::Subscribe, &shared).await;
        assert_eq!(resp, Response::Subscribed);
        assert!(subscribe);
    }

    #[tokio::test]
    async fn test_pause_and_resume_notify_without_frames() {
        let (controls, paused, event_tx) = controls();
        let mut events = event_tx.subscribe();
        let shared = Shared::new(Duration::from_secs(2), controls);

        Server::process_request(Request::Pause, &shared).await;
        assert!(paused.load(Ordering::SeqCst));
        assert_eq!(events.try_recv().unwrap(), GestureEvent::DetectionPaused);

        // Pausing twice announces nothing new
        Server::process_request(Request::Pause, &shared).await;
        assert!(events.try_recv().is_err());

        Server::process_request(Request::Resume, &shared).await;
        assert!(!paused.load(Ordering::SeqCst));
        assert_eq!(events.try_recv().unwrap(), GestureEvent::DetectionResumed);

        Server::process_request(Request::Resume, &shared).await;
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_shutdown_request_triggers_signal() {
        let (controls, _, _tx) = controls();
        let shutdown = controls.shutdown.clone();
        let shared = Shared::new(Duration::from_secs(2), controls);

        let (resp, _) = Server::process_request(Request::Shutdown, &shared).await;
        assert_eq!(resp, Response::Ack);

        let waited = tokio::time::timeout(Duration::from_secs(1), shutdown.wait()).await;
        assert!(waited.is_ok());
    }

    #[tokio::test]
    async fn test_read_message_rejects_oversized() {
        let mut data = ((MAX_MESSAGE_LEN + 1) as u32).to_le_bytes().to_vec();
        data.extend_from_slice(b"{}");
        let mut reader = std::io::Cursor::new(data);
        assert!(read_message(&mut reader).await.is_err());

        let mut empty = std::io::Cursor::new(Vec::new());
        assert!(read_message(&mut empty).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_socket_round_trip_and_notifications() {
        let socket_path = std::env::temp_dir()
            .join(format!("gesture-deck-test-{}", std::process::id()))
            .join("daemon.sock");
        let (controls, _, event_tx) = controls();
        let server = Arc::new(Server::new(&socket_path, Duration::from_secs(2), controls).unwrap());

        let runner = Arc::clone(&server);
        let handle = tokio::spawn(async move { runner.run().await });

        let mut client = UnixStream::connect(&socket_path).await.unwrap();
        assert_eq!(request(&mut client, &Request::Ping).await, Response::Pong);

        // Garbage gets an error reply, the connection stays usable
        client.write_all(&3u32.to_le_bytes()).await.unwrap();
        client.write_all(b"???").await.unwrap();
        assert!(matches!(receive(&mut client).await, Response::Error { .. }));

        assert_eq!(
            request(&mut client, &Request::Subscribe).await,
            Response::Subscribed
        );

        let event = GestureEvent::GestureConfirmed {
            gesture: Gesture::NextSlide,
            held_ms: 2000,
        };
        server.record_event(&event).await;
        event_tx.send(event.clone()).unwrap();
        assert_eq!(receive(&mut client).await, Response::Notification { event });

        match request(&mut client, &Request::GetStatus).await {
            Response::Status(status) => {
                assert_eq!(status.confirmed_count, 1);
                assert_eq!(status.last_gesture, Some(Gesture::NextSlide));
            }
            other => panic!("unexpected response {:?}", other),
        }

        server.shutdown().await;
        handle.abort();
        assert!(!socket_path.exists());
    }
}
