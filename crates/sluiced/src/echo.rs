//! TCP echo relay — each connection's read half is relayed into its own
//! write half until the peer half-closes.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use sluice_core::Relay;
use sluice_services::{ReaderSource, TransferKind, TransferTable, WriterSink};

pub struct EchoListener {
    listener: TcpListener,
    transfers: TransferTable,
    read_buffer_bytes: usize,
    shutdown_tx: broadcast::Sender<()>,
}

impl EchoListener {
    pub async fn bind(
        port: u16,
        transfers: TransferTable,
        read_buffer_bytes: usize,
        shutdown_tx: broadcast::Sender<()>,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        Ok(Self {
            listener,
            transfers,
            read_buffer_bytes,
            shutdown_tx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let mut shutdown = self.shutdown_tx.subscribe();
        tracing::info!(addr = %self.local_addr()?, "echo relay listening");
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("echo relay shutting down");
                    return Ok(());
                }

                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(a) => a,
                        Err(e) => {
                            tracing::warn!(error = %e, "accept failed");
                            continue;
                        }
                    };
                    tokio::spawn(echo_connection(
                        stream,
                        peer,
                        self.transfers.clone(),
                        self.read_buffer_bytes,
                        self.shutdown_tx.subscribe(),
                    ));
                }
            }
        }
    }
}

async fn echo_connection(
    stream: TcpStream,
    peer: SocketAddr,
    transfers: TransferTable,
    read_buffer_bytes: usize,
    shutdown: broadcast::Receiver<()>,
) {
    let (read, write) = stream.into_split();
    let mut guard = transfers.begin(TransferKind::Socket, peer.to_string());

    let result = Relay::new(
        ReaderSource::new(read, read_buffer_bytes),
        WriterSink::new(write),
    )
    .observe(&mut guard)
    .run_until(shutdown)
    .await;

    match result {
        Ok(summary) => guard.complete(&summary),
        Err(e) => guard.fail(&e),
    }
}
