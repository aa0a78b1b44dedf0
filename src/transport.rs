//! Envelope transport over a duplex, ordered, message-based channel.
//!
//! Any `AsyncRead`/`AsyncWrite` pair works: a Unix socket, stdio, or an
//! in-memory duplex. Envelopes are framed as one JSON object per line.

use std::path::Path;

use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    net::UnixStream,
    sync::mpsc,
    task::JoinHandle,
};

use crate::{error::Result, protocol::Envelope};

/// Sending half of a transport. Cheap to clone, never blocks.
#[derive(Debug, Clone)]
pub struct Outbox(mpsc::UnboundedSender<Envelope>);

impl Outbox {
    pub const fn new(sender: mpsc::UnboundedSender<Envelope>) -> Self {
        Self(sender)
    }

    /// Post an envelope to the peer. Returns `false` once the channel is closed.
    pub fn send(&self, envelope: Envelope) -> bool {
        if self.0.send(envelope).is_err() {
            tracing::debug!("Outbound channel closed, envelope dropped");
            return false;
        }
        true
    }
}

/// Namespaced envelope transport to a single peer.
pub struct Transport {
    namespace: String,
    inbound: mpsc::Receiver<Envelope>,
    outbox: Outbox,
    tasks: Vec<JoinHandle<()>>,
}

impl Transport {
    /// Build a transport over already-decoded envelope channels.
    pub fn from_channels(
        namespace: impl Into<String>,
        inbound: mpsc::Receiver<Envelope>,
        outbound: mpsc::UnboundedSender<Envelope>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            inbound,
            outbox: Outbox::new(outbound),
            tasks: Vec::new(),
        }
    }

    /// Spawn line-framed reader and writer tasks over a byte stream pair.
    pub fn spawn_lines<R, W>(namespace: impl Into<String>, reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (in_tx, in_rx) = mpsc::channel::<Envelope>(16);
        let (out_tx, out_rx) = mpsc::unbounded_channel::<Envelope>();

        let tasks = vec![
            tokio::spawn(read_lines(reader, in_tx)),
            tokio::spawn(write_lines(writer, out_rx)),
        ];

        Self {
            namespace: namespace.into(),
            inbound: in_rx,
            outbox: Outbox::new(out_tx),
            tasks,
        }
    }

    /// Connect to a host listening on a Unix socket.
    pub async fn connect_unix(namespace: impl Into<String>, path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path).await?;
        tracing::info!("Connected to host at {}", path.display());
        let (reader, writer) = stream.into_split();
        Ok(Self::spawn_lines(namespace, reader, writer))
    }

    /// Use this process's stdin and stdout as the channel to the host.
    pub fn stdio(namespace: impl Into<String>) -> Self {
        Self::spawn_lines(namespace, tokio::io::stdin(), tokio::io::stdout())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Whether an envelope belongs to our traffic.
    pub fn accepts(&self, envelope: &Envelope) -> bool {
        !envelope.id.is_empty() && envelope.id.starts_with(&self.namespace)
    }

    /// Next envelope passing the namespace filter, or `None` when the channel closes.
    ///
    /// Cancel safe: foreign envelopes are discarded either way.
    pub async fn recv(&mut self) -> Option<Envelope> {
        loop {
            let envelope = self.inbound.recv().await?;
            if self.accepts(&envelope) {
                return Some(envelope);
            }
            tracing::debug!(
                "Dropping foreign envelope type={:?} id={:?}",
                envelope.kind,
                envelope.id
            );
        }
    }

    pub fn send(&self, envelope: Envelope) -> bool {
        self.outbox.send(envelope)
    }

    pub fn outbox(&self) -> Outbox {
        self.outbox.clone()
    }

    /// Deregister from the channel: stop the I/O tasks and refuse further input.
    pub fn close(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.inbound.close();
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.close();
    }
}

async fn read_lines<R>(reader: R, in_tx: mpsc::Sender<Envelope>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => match serde_json::from_str::<Envelope>(&line) {
                Ok(envelope) => {
                    if in_tx.send(envelope).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::debug!("Skipping undecodable line: {e}"),
            },
            Ok(None) => {
                tracing::info!("Host closed the channel");
                break;
            }
            Err(e) => {
                tracing::warn!("Read error: {e}");
                break;
            }
        }
    }
}

async fn write_lines<W>(mut writer: W, mut out_rx: mpsc::UnboundedReceiver<Envelope>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(envelope) = out_rx.recv().await {
        let Ok(json) = serde_json::to_string(&envelope) else {
            continue;
        };
        let line = format!("{json}\n");
        if writer.write_all(line.as_bytes()).await.is_err() || writer.flush().await.is_err() {
            tracing::warn!("Write failed, closing outbound channel");
            break;
        }
    }
}
