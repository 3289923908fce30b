//! IPC (Inter-Process Communication) via Unix sockets
//!
//! Lets a console talk to a remote layout store (`frameboard serve`).
//! Uses length-prefixed JSON over Unix domain sockets.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

mod messages;
pub use messages::{StoreRequest, StoreResponse};

use crate::constants::{ipc::MAX_MESSAGE_SIZE, paths};
use crate::error::StoreError;
use crate::layout::Layout;
use crate::store::{FileStore, LayoutDocument, LayoutStore, SaveRequest};

/// Get default socket path (XDG_RUNTIME_DIR with fallback to cache)
pub fn default_socket_path() -> Result<PathBuf> {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return Ok(PathBuf::from(runtime_dir)
            .join(paths::APP_DIR)
            .join(paths::SOCKET_FILENAME));
    }

    // Fallback to cache dir
    let cache = dirs::cache_dir()
        .context("Failed to determine cache directory (no XDG_RUNTIME_DIR or HOME)")?;
    Ok(cache.join(paths::APP_DIR).join(paths::SOCKET_FILENAME))
}

/// Client connection to the store server
pub struct StoreClient {
    stream: UnixStream,
}

impl StoreClient {
    /// Connect to specific socket path
    pub fn connect_to(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path)
            .context(format!("Failed to connect to layout store at {}", path.display()))?;
        Ok(Self { stream })
    }

    pub fn send_request(&mut self, req: &StoreRequest) -> Result<()> {
        write_message(&mut self.stream, req)
    }

    /// Receive response from the server (blocking)
    pub fn recv_response(&mut self) -> Result<StoreResponse> {
        read_message(&mut self.stream)
    }

    /// Send request and wait for response (convenience method)
    pub fn request(&mut self, req: StoreRequest) -> Result<StoreResponse> {
        self.send_request(&req)?;
        self.recv_response()
    }
}

/// Server listener for the layout store
pub struct StoreServer {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl StoreServer {
    /// Create server and bind to specific socket path
    pub fn bind_to(socket_path: PathBuf) -> Result<Self> {
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create socket directory: {}", parent.display()))?;
        }

        // Remove stale socket if exists
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)
                .context(format!("Failed to remove stale socket: {}", socket_path.display()))?;
        }

        let listener = UnixListener::bind(&socket_path)
            .context(format!("Failed to bind socket at {}", socket_path.display()))?;

        // Owner only
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o700))
                .context("Failed to set socket permissions")?;
        }

        Ok(Self {
            listener,
            socket_path,
        })
    }

    /// Accept incoming connection (blocking)
    pub fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self.listener.accept()
            .context("Failed to accept IPC connection")?;
        Ok(stream)
    }

    pub fn path(&self) -> &Path {
        &self.socket_path
    }

    /// Serve connections one after another, forever
    pub fn run(&self, store: &FileStore) -> Result<()> {
        info!(socket = %self.socket_path.display(), document = %store.path().display(), "Layout store listening");
        loop {
            let stream = self.accept()?;
            if let Err(e) = serve_connection(stream, store) {
                warn!(error = ?e, "Store connection ended with error");
            }
        }
    }
}

impl Drop for StoreServer {
    fn drop(&mut self) {
        // Clean up socket file
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Answer requests on one connection until the peer hangs up
pub fn serve_connection(mut stream: UnixStream, store: &FileStore) -> Result<()> {
    loop {
        let req: StoreRequest = match read_message(&mut stream) {
            Ok(req) => req,
            Err(e) if is_disconnect(&e) => {
                debug!("Store client disconnected");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let resp = handle_request(store, req);
        write_message(&mut stream, &resp)?;
    }
}

fn is_disconnect(e: &anyhow::Error) -> bool {
    e.downcast_ref::<std::io::Error>()
        .is_some_and(|io| io.kind() == std::io::ErrorKind::UnexpectedEof)
}

pub fn handle_request(store: &FileStore, req: StoreRequest) -> StoreResponse {
    match req {
        StoreRequest::Load => match store.load_blocking() {
            Ok(document) => StoreResponse::Document(document),
            Err(e) => {
                error!(error = %e, "Load failed");
                StoreResponse::Error(e.to_string())
            }
        },
        StoreRequest::Save(SaveRequest { layout }) => match store.save_blocking(&layout) {
            Ok(()) => StoreResponse::Saved,
            Err(e) => {
                error!(error = %e, "Save failed");
                StoreResponse::Error(e.to_string())
            }
        },
        StoreRequest::Ping => StoreResponse::Pong,
    }
}

/// Layout store reached through a [`StoreServer`] socket. Each call opens its
/// own connection on the blocking pool.
#[derive(Debug, Clone)]
pub struct IpcStore {
    socket: PathBuf,
}

impl IpcStore {
    pub fn new(socket: PathBuf) -> Self {
        Self { socket }
    }

    async fn call(&self, req: StoreRequest) -> Result<StoreResponse, StoreError> {
        let socket = self.socket.clone();
        tokio::task::spawn_blocking(move || StoreClient::connect_to(&socket)?.request(req))
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?
            .map_err(|e| StoreError::Transport(format!("{e:#}")))
    }
}

impl LayoutStore for IpcStore {
    async fn load(&self) -> Result<LayoutDocument, StoreError> {
        match self.call(StoreRequest::Load).await? {
            StoreResponse::Document(document) => Ok(document),
            StoreResponse::Error(msg) => Err(StoreError::Remote(msg)),
            other => Err(StoreError::Transport(format!("unexpected reply to load: {other:?}"))),
        }
    }

    async fn save(&self, layout: &Layout) -> Result<(), StoreError> {
        let req = StoreRequest::Save(SaveRequest { layout: layout.clone() });
        match self.call(req).await? {
            StoreResponse::Saved => Ok(()),
            StoreResponse::Error(msg) => Err(StoreError::Remote(msg)),
            other => Err(StoreError::Transport(format!("unexpected reply to save: {other:?}"))),
        }
    }
}

/// Write length-prefixed message to stream
fn write_message<T: Serialize, W: Write>(stream: &mut W, msg: &T) -> Result<()> {
    let json = serde_json::to_vec(msg).context("Failed to serialize message to JSON")?;

    // Write length prefix (u32 little-endian)
    let len = json.len() as u32;
    stream
        .write_all(&len.to_le_bytes())
        .context("Failed to write message length")?;

    stream
        .write_all(&json)
        .context("Failed to write message payload")?;

    stream.flush().context("Failed to flush stream")?;

    Ok(())
}

/// Read length-prefixed message from stream
fn read_message<T: for<'de> Deserialize<'de>, R: Read>(stream: &mut R) -> Result<T> {
    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .context("Failed to read message length")?;
    let len = u32::from_le_bytes(len_buf) as usize;

    // Sanity check (prevent DoS via huge allocation)
    if len > MAX_MESSAGE_SIZE {
        return Err(anyhow!("Message too large: {} bytes (max: {})", len, MAX_MESSAGE_SIZE));
    }

    let mut json_buf = vec![0u8; len];
    stream
        .read_exact(&mut json_buf)
        .context("Failed to read message payload")?;

    serde_json::from_slice(&json_buf).context("Failed to deserialize message from JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FrameBox;

    #[test]
    fn test_oversized_message_rejected() {
        let mut bytes = ((MAX_MESSAGE_SIZE + 1) as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(b"{}");
        let result: Result<StoreResponse> = read_message(&mut bytes.as_slice());
        assert!(result.unwrap_err().to_string().contains("too large"));
    }

    #[test]
    fn test_eof_counts_as_disconnect() {
        let result: Result<StoreRequest> = read_message(&mut [0u8; 0].as_slice());
        assert!(is_disconnect(&result.unwrap_err()));
    }

    #[test]
    fn test_handle_request_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("dashboard.json"));

        let mut layout = Layout::with_order(["summary"]);
        layout.set_box("summary", FrameBox::new(0, 0, 360, 280));

        assert!(matches!(
            handle_request(&store, StoreRequest::Save(SaveRequest { layout: layout.clone() })),
            StoreResponse::Saved
        ));
        match handle_request(&store, StoreRequest::Load) {
            StoreResponse::Document(document) => assert_eq!(document.layout, layout),
            other => panic!("unexpected response: {other:?}"),
        }
        assert!(matches!(handle_request(&store, StoreRequest::Ping), StoreResponse::Pong));
    }

    #[test]
    fn test_handle_request_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        std::fs::write(&path, "garbage").unwrap();
        let store = FileStore::new(path);
        assert!(matches!(handle_request(&store, StoreRequest::Load), StoreResponse::Error(_)));
    }

    #[tokio::test]
    async fn test_ipc_store_round_trip_through_server() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("run").join("store.sock");
        let store = FileStore::new(dir.path().join("dashboard.json"));
        let server = StoreServer::bind_to(socket.clone()).unwrap();

        let handle = std::thread::spawn(move || {
            // One connection per call: save, then load
            for _ in 0..2 {
                let stream = server.accept().unwrap();
                serve_connection(stream, &store).unwrap();
            }
        });

        let remote = IpcStore::new(socket);
        let layout = Layout::with_order(["todo"]);
        remote.save(&layout).await.unwrap();
        let document = remote.load().await.unwrap();
        assert_eq!(document.layout, layout);

        handle.join().unwrap();
    }

    #[tokio::test]
    async fn test_ipc_store_without_server_is_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let remote = IpcStore::new(dir.path().join("missing.sock"));
        assert!(matches!(remote.load().await, Err(StoreError::Transport(_))));
    }
}
