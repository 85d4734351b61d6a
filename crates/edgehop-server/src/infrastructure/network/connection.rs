//! Per-connection socket ownership and the I/O task.
//!
//! A [`Connection`] is the single owner of one client's TCP socket, its
//! buffered stream pair, and the background task pumping bytes between
//! them.  The teardown sequence (stop output, let the writer drain and
//! half-close, unblock the reader, join the task, release the socket) is
//! encoded once in [`Connection::close`] instead of being repeated at call
//! sites.

use crate::infrastructure::network::stream::{ConnectionBuffers, IO_CHUNK};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// How long `close` waits for the I/O task to drain before aborting it.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Single-owner handle for one client connection.
pub struct Connection {
    id: Uuid,
    peer: SocketAddr,
    buffers: Arc<ConnectionBuffers>,
    shutdown_tx: watch::Sender<bool>,
    io_task: JoinHandle<()>,
}

impl Connection {
    /// Takes ownership of an accepted socket and starts its I/O task.
    ///
    /// Nagle is disabled: the protocol is many short messages, and mouse
    /// motion in particular is useless when coalesced.
    pub fn spawn(socket: TcpStream) -> std::io::Result<Connection> {
        socket.set_nodelay(true)?;
        let peer = socket.peer_addr()?;
        let id = Uuid::new_v4();
        let buffers = Arc::new(ConnectionBuffers::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let io_task = tokio::spawn(io_loop(socket, Arc::clone(&buffers), shutdown_rx, id));
        Ok(Connection { id, peer, buffers, shutdown_tx, io_task })
    }

    /// Connection identifier for log correlation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// The stream pair shared with the interpreter and dispatcher.
    pub fn buffers(&self) -> Arc<ConnectionBuffers> {
        Arc::clone(&self.buffers)
    }

    /// Tears the connection down in the required order: close the output
    /// (the writer drains what is queued, then half-closes the socket for
    /// write), signal the reader (which hangs up the input ring), join the
    /// I/O task, and only then release the socket by dropping it inside
    /// the task.
    pub async fn close(self) {
        self.buffers.close_output();
        let _ = self.shutdown_tx.send(true);
        let mut io_task = self.io_task;
        match tokio::time::timeout(CLOSE_GRACE, &mut io_task).await {
            Ok(_) => debug!(conn = %self.id, "connection closed"),
            Err(_) => {
                warn!(conn = %self.id, "I/O task did not drain in time; aborting");
                io_task.abort();
            }
        }
    }
}

/// The per-connection I/O loop: reader and writer halves run concurrently
/// inside one task and the socket is dropped when both finish.
async fn io_loop(
    socket: TcpStream,
    buffers: Arc<ConnectionBuffers>,
    mut shutdown_rx: watch::Receiver<bool>,
    id: Uuid,
) {
    let (mut rd, mut wr) = socket.into_split();

    let read_buffers = Arc::clone(&buffers);
    let reader = async move {
        let mut buf = [0u8; IO_CHUNK];
        loop {
            tokio::select! {
                res = rd.read(&mut buf) => match res {
                    Ok(0) => {
                        debug!(conn = %id, "peer hung up");
                        break;
                    }
                    Ok(n) => read_buffers.fill_input(&buf[..n]),
                    Err(e) => {
                        debug!(conn = %id, "socket read failed: {e}");
                        break;
                    }
                },
                _ = shutdown_rx.changed() => break,
            }
        }
        read_buffers.hangup_input();
    };

    let writer = async {
        while let Some(chunk) = buffers.next_outbound().await {
            if let Err(e) = wr.write_all(&chunk).await {
                debug!(conn = %id, "socket write failed: {e}");
                break;
            }
        }
        // Half-close for write so the peer sees a clean end of stream.
        let _ = wr.shutdown().await;
    };

    tokio::join!(reader, writer);
    // Both halves dropped here: the socket is released last.
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn local_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (server, client)
    }

    #[tokio::test]
    async fn test_bytes_from_the_socket_appear_in_the_input_ring() {
        let (server, mut client) = local_pair().await;
        let conn = Connection::spawn(server).unwrap();
        let buffers = conn.buffers();

        client.write_all(b"hello").await.unwrap();

        assert_eq!(buffers.read_exact(5).await, Some(b"hello".to_vec()));
        conn.close().await;
    }

    #[tokio::test]
    async fn test_output_ring_bytes_reach_the_socket() {
        let (server, mut client) = local_pair().await;
        let conn = Connection::spawn(server).unwrap();
        let buffers = conn.buffers();

        buffers.write_output(b"world");
        buffers.flush().await;

        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"world");
        conn.close().await;
    }

    #[tokio::test]
    async fn test_peer_hangup_hangs_up_the_input_ring() {
        let (server, client) = local_pair().await;
        let conn = Connection::spawn(server).unwrap();
        let buffers = conn.buffers();

        drop(client);

        // The blocked read observes the hangup rather than waiting forever.
        assert_eq!(buffers.read_exact(1).await, None);
        conn.close().await;
    }

    #[tokio::test]
    async fn test_close_drains_queued_output_before_half_close() {
        let (server, mut client) = local_pair().await;
        let conn = Connection::spawn(server).unwrap();
        let buffers = conn.buffers();

        buffers.write_output(b"goodbye");
        conn.close().await;

        let mut received = Vec::new();
        client.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"goodbye");
    }

    #[tokio::test]
    async fn test_close_unblocks_a_pending_reader() {
        let (server, _client) = local_pair().await;
        let conn = Connection::spawn(server).unwrap();
        let buffers = conn.buffers();

        let pending = tokio::spawn(async move { buffers.read_exact(1).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        conn.close().await;

        assert_eq!(pending.await.unwrap(), None);
    }
}
