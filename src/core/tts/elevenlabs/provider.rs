use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::ElevenLabsConfig;
use super::messages::{StreamResponse, TextMessage};
use super::voices::select_voice;
use crate::core::audiosocket::{AudioSink, AudioSocketError, OUTPUT_SAMPLE_RATE, downsample};
use crate::core::collaborators::{Event, EventPublisher, VariableStore};
use crate::core::metrics::StreamingMetrics;
use crate::core::models::{Message, Streaming, VendorName};
use crate::core::tts::base::{SessionContext, Streamer, TTSError, TTSResult, VendorSession};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, WsMessage>;
type WsReader = SplitStream<WsStream>;

/// Capacity of the reader to processing loop channel.
const VENDOR_CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// Streamer
// =============================================================================

/// Opens ElevenLabs sessions.
pub struct ElevenLabsStreamer {
    config: ElevenLabsConfig,
    variables: Arc<dyn VariableStore>,
    metrics: Arc<StreamingMetrics>,
}

impl ElevenLabsStreamer {
    pub fn new(
        config: ElevenLabsConfig,
        variables: Arc<dyn VariableStore>,
        metrics: Arc<StreamingMetrics>,
    ) -> Self {
        Self {
            config,
            variables,
            metrics,
        }
    }
}

async fn connect(config: &ElevenLabsConfig, streaming_id: Uuid, voice_id: &str) -> TTSResult<WsStream> {
    let url = config.stream_url(voice_id)?;

    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| TTSError::ConnectionFailed(e.to_string()))?;
    let api_key = HeaderValue::from_str(&config.api_key)
        .map_err(|_| TTSError::InvalidConfiguration("invalid ElevenLabs API key".to_string()))?;
    request.headers_mut().insert("xi-api-key", api_key);

    debug!(
        streaming_id = %streaming_id,
        voice_id = %voice_id,
        "Connecting to ElevenLabs at {}", url
    );

    let (ws_stream, _) = connect_async(request).await.map_err(|e| {
        TTSError::ConnectionFailed(format!("failed to connect to ElevenLabs: {e}"))
    })?;
    Ok(ws_stream)
}

#[async_trait]
impl Streamer for ElevenLabsStreamer {
    fn vendor(&self) -> VendorName {
        VendorName::ElevenLabs
    }

    async fn init(&self, ctx: SessionContext) -> TTSResult<Arc<dyn VendorSession>> {
        if self.config.api_key.is_empty() {
            return Err(TTSError::InvalidConfiguration(
                "ElevenLabs API key not configured".to_string(),
            ));
        }
        let input_rate = self.config.input_sample_rate()?;

        let voice_id = select_voice(&ctx.streaming, self.variables.as_ref()).await;

        let ws_stream = tokio::select! {
            res = connect(&self.config, ctx.streaming.id, &voice_id) => res.inspect_err(|_| {
                self.metrics.record_vendor_error(VendorName::ElevenLabs);
            })?,
            _ = ctx.cancel.cancelled() => return Err(TTSError::SessionClosed),
        };
        let (writer, reader) = ws_stream.split();

        info!(
            streaming_id = %ctx.streaming.id,
            voice_id = %voice_id,
            "ElevenLabs session initialized"
        );

        Ok(Arc::new(ElevenLabsSession {
            progress: parking_lot::Mutex::new(Message::new(ctx.streaming.id)),
            streaming: ctx.streaming,
            config: self.config.clone(),
            voice_id,
            writer: tokio::sync::Mutex::new(writer),
            reader: parking_lot::Mutex::new(Some((0, reader))),
            generation: AtomicU64::new(0),
            replaced: Notify::new(),
            sink: ctx.sink,
            cancel: ctx.cancel.child_token(),
            events: ctx.events,
            metrics: self.metrics.clone(),
            input_rate,
        }))
    }
}

// =============================================================================
// Session
// =============================================================================

enum VendorEvent {
    Payload(String),
    Closed(Option<String>),
    Failed(String),
}

/// A live ElevenLabs stream bound to one speaking session.
///
/// A flush with text still pending replaces the vendor stream, since ElevenLabs
/// offers no way to cancel text already sent. Every stream carries a generation
/// number and output of a replaced stream is ignored.
pub struct ElevenLabsSession {
    streaming: Streaming,
    config: ElevenLabsConfig,
    voice_id: String,

    /// Writes are serialized; text and keep-alives may come from different tasks.
    /// Held across a flush so no text is sent to a stream being replaced.
    writer: tokio::sync::Mutex<WsWriter>,
    /// Reader of the newest stream and its generation, taken by `run`.
    reader: parking_lot::Mutex<Option<(u64, WsReader)>>,
    /// Generation of the stream behind `writer`. Only changed with `progress` locked.
    generation: AtomicU64,
    /// Wakes `run` to pick up a replacement reader.
    replaced: Notify,

    sink: Arc<AudioSink>,
    cancel: CancellationToken,

    progress: parking_lot::Mutex<Message>,

    events: Arc<dyn EventPublisher>,
    metrics: Arc<StreamingMetrics>,

    input_rate: u32,
}

async fn send_text(writer: &mut WsWriter, text: &str, flush: bool) -> TTSResult<()> {
    let payload = serde_json::to_string(&TextMessage::new(text, flush))
        .map_err(|e| TTSError::ProviderError(format!("failed to encode text: {e}")))?;

    writer
        .send(WsMessage::Text(payload.into()))
        .await
        .map_err(|e| TTSError::NetworkError(format!("failed to send text to ElevenLabs: {e}")))
}

impl ElevenLabsSession {
    fn is_finished(&self) -> bool {
        self.progress.lock().finished
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    async fn send_keepalive(&self) -> TTSResult<()> {
        let mut writer = self.writer.lock().await;
        send_text(&mut writer, " ", false).await
    }

    /// Applies alignment and ends the session once everything was played.
    fn advance(&self, generation: u64, chars: &str) {
        let (completed, snapshot) = {
            let mut progress = self.progress.lock();
            if !self.is_current(generation) {
                return;
            }
            let completed = progress.advance(chars);
            (completed, progress.clone())
        };

        if completed > 0 {
            self.events.publish(Event::MessagePlayFinished(snapshot.clone()));
        }

        if snapshot.is_complete() {
            info!(
                streaming_id = %self.streaming.id,
                played_count = snapshot.played_count,
                "All queued text played"
            );
            self.cancel.cancel();
        }
    }

    fn complete_all(&self, generation: u64) {
        let (was_pending, snapshot) = {
            let mut progress = self.progress.lock();
            if !self.is_current(generation) {
                return;
            }
            let was_pending = progress.has_pending();
            progress.played_count = progress.total_count;
            (was_pending, progress.clone())
        };
        if was_pending {
            self.events.publish(Event::MessagePlayFinished(snapshot.clone()));
        }
        if snapshot.is_complete() {
            self.cancel.cancel();
        }
    }

    async fn handle_response(&self, generation: u64, payload: &str) -> TTSResult<()> {
        if !self.is_current(generation) {
            debug!(streaming_id = %self.streaming.id, "Dropping output of a replaced stream");
            return Ok(());
        }

        let response: StreamResponse = match serde_json::from_str(payload) {
            Ok(response) => response,
            Err(e) => {
                warn!(streaming_id = %self.streaming.id, "Could not parse ElevenLabs message: {}", e);
                return Ok(());
            }
        };

        if let Some(message) = response.error_message() {
            return Err(TTSError::ProviderError(message));
        }

        if let Some(status) = response.status.as_deref() {
            debug!(streaming_id = %self.streaming.id, "ElevenLabs status: {}", status);
        }

        if let Some(audio) = response.audio.as_deref().filter(|a| !a.is_empty()) {
            let pcm = BASE64
                .decode(audio)
                .map_err(|e| TTSError::ProviderError(format!("invalid base64 audio: {e}")))?;
            if pcm.len() % 2 != 0 {
                return Err(AudioSocketError::InvalidAudio(format!(
                    "PCM16 data must have an even length, got {} bytes",
                    pcm.len()
                ))
                .into());
            }

            let pcm = downsample(&pcm, self.input_rate, OUTPUT_SAMPLE_RATE)?;
            self.sink.write_paced(&pcm).await?;
        }

        if let Some(chars) = response.alignment_text() {
            self.advance(generation, &chars);
        }

        if response.is_final() {
            debug!(streaming_id = %self.streaming.id, "Received final message");
            self.complete_all(generation);
        }

        Ok(())
    }

    /// Opens a fresh vendor stream in place of the current one.
    ///
    /// Must be called with the writer locked. Returns the replaced writer.
    async fn replace_stream(&self, writer: &mut WsWriter) -> TTSResult<WsWriter> {
        let ws_stream = tokio::select! {
            res = connect(&self.config, self.streaming.id, &self.voice_id) => res?,
            _ = self.cancel.cancelled() => return Err(TTSError::SessionClosed),
        };
        let (new_writer, new_reader) = ws_stream.split();

        let generation = {
            let mut progress = self.progress.lock();
            let generation = self.generation.load(Ordering::SeqCst) + 1;
            *self.reader.lock() = Some((generation, new_reader));
            self.generation.store(generation, Ordering::SeqCst);
            progress.discard_pending();
            generation
        };
        // Audio of the old stream written while connecting
        self.sink.discard();

        self.replaced.notify_one();
        debug!(streaming_id = %self.streaming.id, generation, "Replaced ElevenLabs stream");
        Ok(std::mem::replace(writer, new_writer))
    }

    async fn close(&self) {
        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.close().await {
            debug!(streaming_id = %self.streaming.id, "Error closing ElevenLabs socket: {}", e);
        }
    }
}

/// Forwards vendor frames until the stream ends or the session is cancelled.
async fn read_vendor(mut reader: WsReader, tx: mpsc::Sender<VendorEvent>, cancel: CancellationToken) {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return,
            next = reader.next() => next,
        };

        let event = match next {
            Some(Ok(WsMessage::Text(text))) => VendorEvent::Payload(text.as_str().to_owned()),
            Some(Ok(WsMessage::Binary(data))) => match String::from_utf8(data.to_vec()) {
                Ok(text) => VendorEvent::Payload(text),
                Err(_) => continue,
            },
            Some(Ok(WsMessage::Close(frame))) => {
                VendorEvent::Closed(frame.map(|f| f.reason.as_str().to_owned()))
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => VendorEvent::Failed(e.to_string()),
            None => VendorEvent::Closed(None),
        };
        let terminal = !matches!(event, VendorEvent::Payload(_));

        tokio::select! {
            _ = cancel.cancelled() => return,
            sent = tx.send(event) => {
                if sent.is_err() {
                    return;
                }
            }
        }

        if terminal {
            return;
        }
    }
}

#[async_trait]
impl VendorSession for ElevenLabsSession {
    async fn run(&self) -> TTSResult<()> {
        let (mut generation, reader) = self.reader.lock().take().ok_or(TTSError::SessionClosed)?;

        let (tx, mut rx) = mpsc::channel(VENDOR_CHANNEL_CAPACITY);
        let mut tasks = JoinSet::new();
        tasks.spawn(read_vendor(reader, tx, self.cancel.clone()));

        let keepalive_interval = self.config.keepalive_interval;
        let mut keepalive =
            tokio::time::interval_at(Instant::now() + keepalive_interval, keepalive_interval);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let result = loop {
            let replacement = self.reader.lock().take();
            if let Some((newer, reader)) = replacement {
                tasks.shutdown().await;
                let (tx, new_rx) = mpsc::channel(VENDOR_CHANNEL_CAPACITY);
                rx = new_rx;
                tasks.spawn(read_vendor(reader, tx, self.cancel.clone()));
                generation = newer;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break Ok(()),
                _ = self.replaced.notified() => continue,
                _ = keepalive.tick() => {
                    if self.is_finished() {
                        continue;
                    }
                    if let Err(e) = self.send_keepalive().await {
                        break Err(e);
                    }
                }
                event = rx.recv() => match event {
                    Some(VendorEvent::Payload(payload)) => {
                        if let Err(e) = self.handle_response(generation, &payload).await {
                            break Err(e);
                        }
                    }
                    Some(VendorEvent::Closed(_)) | Some(VendorEvent::Failed(_)) if self.cancel.is_cancelled() => {
                        break Ok(());
                    }
                    // The replaced stream winding down
                    Some(_) | None if !self.is_current(generation) => continue,
                    Some(VendorEvent::Closed(_)) if self.is_finished() => break Ok(()),
                    Some(VendorEvent::Closed(reason)) => {
                        break Err(TTSError::ConnectionFailed(format!(
                            "ElevenLabs closed the stream: {}",
                            reason.unwrap_or_default()
                        )));
                    }
                    Some(VendorEvent::Failed(e)) => break Err(TTSError::NetworkError(e)),
                    None => break Ok(()),
                },
            }
        };

        self.cancel.cancel();
        tasks.shutdown().await;
        self.close().await;

        if let Err(e) = &result {
            self.metrics.record_vendor_error(VendorName::ElevenLabs);
            error!(streaming_id = %self.streaming.id, "ElevenLabs session failed: {}", e);
        } else {
            info!(streaming_id = %self.streaming.id, "ElevenLabs session ended");
        }
        result
    }

    async fn say_add(&self, text: &str) -> TTSResult<()> {
        if self.cancel.is_cancelled() || self.is_finished() {
            return Err(TTSError::SessionClosed);
        }
        // Empty text would close the vendor's input stream.
        if text.is_empty() {
            return Ok(());
        }

        let mut writer = self.writer.lock().await;
        let snapshot = {
            let mut progress = self.progress.lock();
            progress.push_text(text);
            progress.clone()
        };

        send_text(&mut writer, text, true).await?;
        drop(writer);

        self.events.publish(Event::MessagePlayStarted(snapshot));
        Ok(())
    }

    async fn say_flush(&self) -> TTSResult<()> {
        if self.cancel.is_cancelled() {
            return Err(TTSError::SessionClosed);
        }

        let mut writer = self.writer.lock().await;
        self.sink.discard();

        let needs_new_stream = {
            let progress = self.progress.lock();
            progress.has_pending() && !progress.finished
        };

        if needs_new_stream {
            let mut old = match self.replace_stream(&mut writer).await {
                Ok(old) => old,
                Err(e) => {
                    self.metrics.record_vendor_error(VendorName::ElevenLabs);
                    error!(streaming_id = %self.streaming.id, "Could not replace ElevenLabs stream: {}", e);
                    self.cancel.cancel();
                    return Err(e);
                }
            };
            drop(writer);
            if let Err(e) = old.close().await {
                debug!(streaming_id = %self.streaming.id, "Error closing replaced socket: {}", e);
            }
        } else {
            self.progress.lock().discard_pending();
        }

        debug!(streaming_id = %self.streaming.id, "Flushed pending text and audio");
        if self.progress.lock().is_complete() {
            self.cancel.cancel();
        }
        Ok(())
    }

    fn say_stop(&self) {
        debug!(streaming_id = %self.streaming.id, "Stopping ElevenLabs session");
        self.cancel.cancel();
    }

    async fn say_finish(&self) -> TTSResult<()> {
        if self.cancel.is_cancelled() {
            return Err(TTSError::SessionClosed);
        }

        let mut writer = self.writer.lock().await;
        let complete = {
            let mut progress = self.progress.lock();
            if progress.finished {
                return Ok(());
            }
            progress.finished = true;
            progress.is_complete()
        };

        if complete {
            self.cancel.cancel();
            return Ok(());
        }

        // Empty text closes the vendor's input stream.
        send_text(&mut writer, "", false).await
    }

    fn message(&self) -> Message {
        self.progress.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::collaborators::{BroadcastEventPublisher, NoopVariableStore};
    use crate::core::models::{Direction, Gender, ReferenceType};
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn streamer(base_url: &str, api_key: &str) -> (ElevenLabsStreamer, Arc<StreamingMetrics>) {
        let metrics = Arc::new(StreamingMetrics::new());
        let config = ElevenLabsConfig {
            base_url: base_url.to_string(),
            ..ElevenLabsConfig::new(api_key)
        };
        let streamer = ElevenLabsStreamer::new(config, Arc::new(NoopVariableStore), metrics.clone());
        (streamer, metrics)
    }

    fn context(cancel: CancellationToken) -> SessionContext {
        SessionContext {
            streaming: Streaming {
                id: Uuid::new_v4(),
                customer_id: Uuid::new_v4(),
                reference_type: ReferenceType::Call,
                reference_id: Uuid::new_v4(),
                language: "en-US".to_string(),
                gender: Gender::Neutral,
                vendor: VendorName::ElevenLabs,
                voice_id: String::new(),
                direction: Direction::Out,
                activeflow_id: None,
                pod_id: "pod-a".to_string(),
            },
            sink: Arc::new(AudioSink::new(Duration::from_millis(2), cancel.clone())),
            cancel,
            events: Arc::new(BroadcastEventPublisher::default()),
        }
    }

    /// WebSocket server that reports `(connection index, text)` for every text frame.
    async fn recording_server() -> (String, mpsc::UnboundedReceiver<(usize, String)>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut index = 0;
            while let Ok((stream, _)) = listener.accept().await {
                let tx = tx.clone();
                let connection = index;
                index += 1;
                tokio::spawn(async move {
                    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                        return;
                    };
                    while let Some(Ok(msg)) = ws.next().await {
                        if let WsMessage::Text(text) = msg {
                            let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
                            let chunk = value["text"].as_str().unwrap_or_default().to_string();
                            let _ = tx.send((connection, chunk));
                        }
                    }
                });
            }
        });

        (format!("ws://{addr}"), rx)
    }

    async fn next_text(rx: &mut mpsc::UnboundedReceiver<(usize, String)>) -> (usize, String) {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_init_requires_api_key() {
        let (streamer, metrics) = streamer("ws://127.0.0.1:1", "");

        let Err(err) = streamer.init(context(CancellationToken::new())).await else {
            panic!("init succeeded without an API key");
        };
        assert!(matches!(err, TTSError::InvalidConfiguration(_)));
        assert_eq!(metrics.vendor_errors(VendorName::ElevenLabs), 0);
    }

    #[tokio::test]
    async fn test_init_unreachable_endpoint_records_vendor_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let (streamer, metrics) = streamer(&format!("ws://{addr}"), "key");

        let Err(err) = streamer.init(context(CancellationToken::new())).await else {
            panic!("init succeeded against a closed port");
        };
        assert!(matches!(err, TTSError::ConnectionFailed(_)));
        assert_eq!(metrics.vendor_errors(VendorName::ElevenLabs), 1);
    }

    #[tokio::test]
    async fn test_init_cancelled_while_connecting() {
        // Accepts TCP but never completes the WebSocket handshake
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (streamer, metrics) = streamer(&format!("ws://{addr}"), "key");

        let cancel = CancellationToken::new();
        cancel.cancel();
        let Err(err) = streamer.init(context(cancel)).await else {
            panic!("init succeeded after cancellation");
        };
        assert!(matches!(err, TTSError::SessionClosed));
        assert_eq!(metrics.vendor_errors(VendorName::ElevenLabs), 0);
        drop(listener);
    }

    #[tokio::test]
    async fn test_empty_text_is_not_sent() {
        let (base_url, mut texts) = recording_server().await;
        let (streamer, _) = streamer(&base_url, "key");
        let session = streamer.init(context(CancellationToken::new())).await.unwrap();

        session.say_add("").await.unwrap();
        session.say_add("Hello").await.unwrap();

        assert_eq!(next_text(&mut texts).await, (0, "Hello".to_string()));
        assert_eq!(session.message().total_count, 1);
    }

    #[tokio::test]
    async fn test_flush_with_pending_text_replaces_stream() {
        let (base_url, mut texts) = recording_server().await;
        let (streamer, metrics) = streamer(&base_url, "key");
        let session = streamer.init(context(CancellationToken::new())).await.unwrap();

        session.say_add("first").await.unwrap();
        assert_eq!(next_text(&mut texts).await, (0, "first".to_string()));

        session.say_flush().await.unwrap();
        let message = session.message();
        assert_eq!(message.total_count, 0);
        assert!(message.total_text.is_empty());

        session.say_add("second").await.unwrap();
        assert_eq!(next_text(&mut texts).await, (1, "second".to_string()));
        assert_eq!(session.message().total_text, "second");
        assert_eq!(metrics.vendor_errors(VendorName::ElevenLabs), 0);
    }

    #[tokio::test]
    async fn test_flush_without_pending_text_keeps_stream() {
        let (base_url, mut texts) = recording_server().await;
        let (streamer, _) = streamer(&base_url, "key");
        let session = streamer.init(context(CancellationToken::new())).await.unwrap();

        session.say_flush().await.unwrap();
        session.say_add("still here").await.unwrap();

        assert_eq!(next_text(&mut texts).await, (0, "still here".to_string()));
    }

    #[tokio::test]
    async fn test_say_after_finish_is_rejected() {
        let (base_url, mut texts) = recording_server().await;
        let (streamer, _) = streamer(&base_url, "key");
        let session = streamer.init(context(CancellationToken::new())).await.unwrap();

        session.say_add("bye").await.unwrap();
        session.say_finish().await.unwrap();
        assert!(matches!(session.say_add("more").await, Err(TTSError::SessionClosed)));

        assert_eq!(next_text(&mut texts).await, (0, "bye".to_string()));
        assert_eq!(next_text(&mut texts).await, (0, String::new()));
    }
}
