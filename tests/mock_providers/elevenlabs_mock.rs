//! WebSocket Mock Server for the ElevenLabs `stream-input` API
//!
//! Every non-blank text chunk is answered with one audio message (16 kHz PCM16)
//! carrying the chunk's characters as alignment. An empty text closes the input
//! stream: the mock replies with `isFinal` and closes the socket.
//!
//! [`MockBehavior`] adds a reply delay and a text that triggers a vendor error.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

/// Samples of 16 kHz audio returned per text chunk (40 ms)
pub const SAMPLES_PER_CHUNK: usize = 640;

/// How the mock answers text chunks
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    /// Wait before answering each text chunk
    pub reply_delay: Duration,
    /// A chunk containing this text is answered with a vendor error
    pub error_trigger: Option<String>,
}

/// Recorded traffic
#[derive(Default)]
pub struct ElevenLabsMockState {
    pub connection_count: AtomicU64,
    pub keepalive_count: AtomicU64,
    /// Request paths including the query string
    pub paths: Mutex<Vec<String>>,
    pub api_keys: Mutex<Vec<String>>,
    /// Non-keep-alive text chunks, in arrival order
    pub texts: Mutex<Vec<String>>,
    /// Same chunks tagged with the index of the connection they arrived on
    pub connection_texts: Mutex<Vec<(u64, String)>>,
}

pub struct ElevenLabsMock {
    pub addr: SocketAddr,
    pub state: Arc<ElevenLabsMockState>,
}

impl ElevenLabsMock {
    pub async fn start() -> Self {
        Self::start_with(MockBehavior::default()).await
    }

    pub async fn start_with(behavior: MockBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(ElevenLabsMockState::default());

        let server_state = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = server_state.clone();
                let behavior = behavior.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, state, behavior).await {
                        eprintln!("ElevenLabs mock connection error: {e}");
                    }
                });
            }
        });

        Self { addr, state }
    }

    /// Value for `ELEVENLABS_BASE_URL`
    pub fn base_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn texts(&self) -> Vec<String> {
        self.state.texts.lock().clone()
    }

    pub fn connection_texts(&self) -> Vec<(u64, String)> {
        self.state.connection_texts.lock().clone()
    }

    pub fn connections(&self) -> u64 {
        self.state.connection_count.load(Ordering::SeqCst)
    }

    pub fn keepalives(&self) -> u64 {
        self.state.keepalive_count.load(Ordering::SeqCst)
    }
}

/// 16 kHz PCM16 ramp, little endian
pub fn pcm_chunk(samples: usize) -> Vec<u8> {
    (0..samples)
        .flat_map(|i| ((i as i16).wrapping_mul(37)).to_le_bytes())
        .collect()
}

async fn handle_connection(
    stream: TcpStream,
    state: Arc<ElevenLabsMockState>,
    behavior: MockBehavior,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let handshake_state = state.clone();
    let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        handshake_state.paths.lock().push(req.uri().to_string());
        let key = req
            .headers()
            .get("xi-api-key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        handshake_state.api_keys.lock().push(key);
        Ok(resp)
    };

    let ws_stream = accept_hdr_async(stream, callback).await?;
    let (mut write, mut read) = ws_stream.split();
    let connection = state.connection_count.fetch_add(1, Ordering::SeqCst);

    while let Some(msg) = read.next().await {
        let text = match msg? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let request: Value = serde_json::from_str(&text)?;
        let chunk = request["text"].as_str().unwrap_or_default().to_string();

        if chunk.is_empty() {
            let final_msg = json!({ "isFinal": true });
            write.send(Message::Text(final_msg.to_string().into())).await?;
            write.send(Message::Close(None)).await?;
            break;
        }
        // Keep-alive
        if chunk.trim().is_empty() {
            state.keepalive_count.fetch_add(1, Ordering::SeqCst);
            continue;
        }

        state.texts.lock().push(chunk.clone());
        state.connection_texts.lock().push((connection, chunk.clone()));

        if !behavior.reply_delay.is_zero() {
            tokio::time::sleep(behavior.reply_delay).await;
        }

        if let Some(trigger) = behavior.error_trigger.as_deref()
            && chunk.contains(trigger)
        {
            let error = json!({
                "error": "quota_exceeded",
                "message": "This request exceeds your quota.",
            });
            write.send(Message::Text(error.to_string().into())).await?;
            continue;
        }

        let chars: Vec<String> = chunk.chars().map(|c| c.to_string()).collect();
        let starts: Vec<u64> = (0..chars.len() as u64).map(|i| i * 10).collect();
        let durations = vec![10u64; chars.len()];
        let response = json!({
            "audio": BASE64.encode(pcm_chunk(SAMPLES_PER_CHUNK)),
            "isFinal": null,
            "alignment": {
                "chars": chars,
                "charStartTimesMs": starts,
                "charsDurationsMs": durations,
            },
        });
        write.send(Message::Text(response.to_string().into())).await?;
    }

    Ok(())
}
