//! WebSocket event stream to a paired sensor.
//!
//! [`EventTransport`] owns one connection at a time. Outbound frames go
//! through an unbounded channel to a writer task, so answering a `ping` never
//! waits on the reader. Inbound frames are exposed as a lazy stream that ends
//! when the socket closes or errors; reconnecting is the caller's job.

pub mod cursor;
pub mod frame;

use crate::EVENTS_ENDPOINT;
use crate::crypto::tls::TlsSettings;
use crate::error::transport::TransportError;
use crate::transport::cursor::SequenceCursor;
use crate::transport::frame::{InboundFrame, OutboundFrame};

use common::ErrorLocation;

use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitStream, unfold};
use futures_util::{SinkExt, Stream, StreamExt};
use log::{debug, info, trace, warn};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{
    Connector, MaybeTlsStream, WebSocketStream, connect_async_tls_with_config,
};
use url::Url;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

type SensorSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct EventTransport {
    url: Url,
    tls: TlsSettings,
    cursor: SequenceCursor,
    connected: Arc<AtomicBool>,
    outbound: Option<mpsc::UnboundedSender<Message>>,
    inbound: Option<SplitStream<SensorSocket>>,
    writer: Option<JoinHandle<()>>,
}

impl EventTransport {
    /// `cursor` tracks the highest seq received on this transport. Pass a
    /// clone to observe it, or a fresh one seeded from the applied position.
    pub fn new(url: Url, tls: TlsSettings, cursor: SequenceCursor) -> Self {
        Self {
            url,
            tls,
            cursor,
            connected: Arc::new(AtomicBool::new(false)),
            outbound: None,
            inbound: None,
            writer: None,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn last_seq(&self) -> u64 {
        self.cursor.get()
    }

    /// Open the socket. Any previous connection is closed first.
    pub async fn connect(&mut self) -> Result<(), TransportError> {
        if self.outbound.is_some() {
            self.disconnect().await;
        }

        let connector = match self.url.scheme() {
            "wss" => Connector::Rustls(self.tls.client_config()?),
            _ => Connector::Plain,
        };

        debug!("Opening event stream to {}", self.url);
        let (socket, _response) =
            connect_async_tls_with_config(self.url.as_str(), None, false, Some(connector))
                .await
                .map_err(|e| TransportError::from_handshake(&e))?;

        let (sink, stream) = socket.split();
        let (outbound, mut queued) = mpsc::unbounded_channel::<Message>();
        let connected = Arc::new(AtomicBool::new(true));

        let writer_connected = connected.clone();
        let writer = tokio::spawn(async move {
            let mut sink = sink;
            while let Some(message) = queued.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = sink.send(message).await {
                    warn!("Event stream write failed: {e}");
                    writer_connected.store(false, Ordering::Release);
                    return;
                }
                if closing {
                    break;
                }
            }
            if let Err(e) = sink.close().await {
                trace!("Event stream close: {e}");
            }
            writer_connected.store(false, Ordering::Release);
        });

        self.connected = connected;
        self.outbound = Some(outbound);
        self.inbound = Some(stream);
        self.writer = Some(writer);

        info!("Event stream connected to {}", self.url);
        Ok(())
    }

    pub fn send_auth(&self, fingerprint: Option<&str>, token: Option<&str>) -> Result<(), TransportError> {
        self.send_frame(&OutboundFrame::Auth {
            fingerprint: fingerprint.map(str::to_string),
            token: token.map(str::to_string),
        })
    }

    pub fn request_replay(&self, since_seq: u64) -> Result<(), TransportError> {
        debug!("Requesting replay since seq {since_seq}");
        self.send_frame(&OutboundFrame::Replay { since_seq })
    }

    pub fn send_frame(&self, frame: &OutboundFrame) -> Result<(), TransportError> {
        let outbound = match (&self.outbound, self.is_connected()) {
            (Some(outbound), true) => outbound,
            _ => return Err(TransportError::not_connected()),
        };

        let text = frame.encode()?;
        outbound
            .send(Message::text(text))
            .map_err(|e| TransportError::Send {
                message: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    /// Hand out the inbound frames of the current connection.
    ///
    /// Can be taken once per `connect()`. `ping` is answered and `event`
    /// advances the cursor before the frame is yielded.
    pub fn receive_events(
        &mut self,
    ) -> Result<impl Stream<Item = InboundFrame> + Send + 'static, TransportError> {
        let (stream, outbound) = match (self.inbound.take(), &self.outbound) {
            (Some(stream), Some(outbound)) => (stream, outbound.clone()),
            _ => return Err(TransportError::not_connected()),
        };

        let reader = FrameReader {
            stream,
            outbound,
            cursor: self.cursor.clone(),
            connected: self.connected.clone(),
        };

        Ok(unfold(reader, |mut reader| async move {
            reader.next_frame().await.map(|frame| (frame, reader))
        }))
    }

    /// Close the socket and wait briefly for the writer to flush. Idempotent.
    pub async fn disconnect(&mut self) {
        self.inbound = None;

        if let Some(outbound) = self.outbound.take() {
            if outbound.send(Message::Close(None)).is_err() {
                trace!("Event stream writer already gone");
            }
        }

        if let Some(writer) = self.writer.take() {
            let abort = writer.abort_handle();
            if tokio::time::timeout(CLOSE_TIMEOUT, writer).await.is_err() {
                warn!("Event stream writer did not finish in {CLOSE_TIMEOUT:?}, aborting");
                abort.abort();
            }
        }

        if self.connected.swap(false, Ordering::AcqRel) {
            info!("Event stream to {} closed", self.url);
        }
    }
}

struct FrameReader {
    stream: SplitStream<SensorSocket>,
    outbound: mpsc::UnboundedSender<Message>,
    cursor: SequenceCursor,
    connected: Arc<AtomicBool>,
}

impl FrameReader {
    async fn next_frame(&mut self) -> Option<InboundFrame> {
        loop {
            let message = match self.stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    warn!("Event stream error: {e}");
                    self.connected.store(false, Ordering::Release);
                    return None;
                }
                None => {
                    info!("Event stream ended");
                    self.connected.store(false, Ordering::Release);
                    return None;
                }
            };

            let frame = match &message {
                Message::Text(text) => InboundFrame::decode(text.as_str().as_bytes()),
                Message::Binary(bytes) => InboundFrame::decode(bytes),
                Message::Close(close) => {
                    info!("Event stream closed by sensor: {close:?}");
                    self.connected.store(false, Ordering::Release);
                    return None;
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };

            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Skipping undecodable event frame: {e}");
                    continue;
                }
            };

            trace!("Received '{}' frame", frame.kind());
            match &frame {
                InboundFrame::Ping => self.send_pong(),
                InboundFrame::Event(event) => {
                    self.cursor.advance(event.seq);
                }
                _ => {}
            }

            return Some(frame);
        }
    }

    fn send_pong(&self) {
        let text = match OutboundFrame::Pong.encode() {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to encode pong: {e}");
                return;
            }
        };
        if self.outbound.send(Message::text(text)).is_err() {
            debug!("Pong dropped, writer closed");
        }
    }
}

/// Event stream URL for a sensor API base: `http` → `ws`, `https` → `wss`.
pub fn events_url(base_url: &Url) -> Result<Url, TransportError> {
    let mut url = base_url
        .join(EVENTS_ENDPOINT)
        .map_err(|e| TransportError::url(format!("Invalid events URL: {e}")))?;

    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        "ws" | "wss" => return Ok(url),
        other => {
            return Err(TransportError::url(format!(
                "Unsupported sensor address scheme '{other}'"
            )));
        }
    };

    url.set_scheme(scheme)
        .map_err(|_| TransportError::url(format!("Cannot switch {url} to {scheme}")))?;
    Ok(url)
}
