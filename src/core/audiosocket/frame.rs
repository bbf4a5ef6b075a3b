use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use uuid::Uuid;

use super::{AudioSocketError, AudioSocketResult};

/// Kind byte plus a two-byte big-endian length.
pub const HEADER_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    Hangup = 0x00,
    Identify = 0x01,
    Audio = 0x10,
    Error = 0xff,
}

impl TryFrom<u8> for FrameKind {
    type Error = AudioSocketError;

    fn try_from(value: u8) -> Result<Self, AudioSocketError> {
        match value {
            0x00 => Ok(Self::Hangup),
            0x01 => Ok(Self::Identify),
            0x10 => Ok(Self::Audio),
            0xff => Ok(Self::Error),
            other => Err(AudioSocketError::UnknownKind(other)),
        }
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(kind: FrameKind, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    pub fn identify(id: Uuid) -> Self {
        Self::new(FrameKind::Identify, Bytes::copy_from_slice(id.as_bytes()))
    }

    pub fn hangup() -> Self {
        Self::new(FrameKind::Hangup, Bytes::new())
    }

    /// Extracts the session id from an identify frame.
    ///
    /// Accepts the 16-byte binary form and, for tooling convenience, the textual form.
    pub fn session_id(&self) -> AudioSocketResult<Uuid> {
        if self.kind != FrameKind::Identify {
            return Err(AudioSocketError::Protocol(format!(
                "expected identify frame, got {:?}",
                self.kind
            )));
        }

        if self.payload.len() == 16 {
            return Uuid::from_slice(&self.payload)
                .map_err(|e| AudioSocketError::Protocol(format!("invalid session id: {e}")));
        }

        let text = std::str::from_utf8(&self.payload)
            .map_err(|_| AudioSocketError::Protocol("session id is not valid UTF-8".to_string()))?;
        Uuid::parse_str(text.trim())
            .map_err(|e| AudioSocketError::Protocol(format!("invalid session id: {e}")))
    }

    /// Encodes the frame with the inbound length-prefixed header.
    pub fn encode(&self) -> AudioSocketResult<Bytes> {
        let len = u16::try_from(self.payload.len()).map_err(|_| {
            AudioSocketError::Protocol(format!("payload too large: {}", self.payload.len()))
        })?;

        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        buf.put_u8(self.kind as u8);
        buf.put_u16(len);
        buf.put_slice(&self.payload);
        Ok(buf.freeze())
    }
}

/// Reads one length-prefixed frame.
pub async fn read_frame<R>(reader: &mut R) -> AudioSocketResult<Frame>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).await?;

    let kind = FrameKind::try_from(header[0])?;
    let len = u16::from_be_bytes([header[1], header[2]]) as usize;

    let mut payload = vec![0u8; len];
    if len > 0 {
        reader.read_exact(&mut payload).await?;
    }

    Ok(Frame {
        kind,
        payload: Bytes::from(payload),
    })
}

/// Wraps 16-bit PCM into an outbound audio frame.
///
/// The header is the audio kind byte followed by the sample count as a
/// big-endian `u16`; the input bytes follow unchanged.
pub fn wrap_pcm16(data: &[u8]) -> AudioSocketResult<Bytes> {
    if data.len() % 2 != 0 {
        return Err(AudioSocketError::InvalidAudio(format!(
            "PCM16 data must have an even length, got {} bytes",
            data.len()
        )));
    }

    let samples = u16::try_from(data.len() / 2).map_err(|_| {
        AudioSocketError::InvalidAudio(format!("too many samples for one frame: {}", data.len() / 2))
    })?;

    let mut buf = BytesMut::with_capacity(HEADER_LEN + data.len());
    buf.put_u8(FrameKind::Audio as u8);
    buf.put_u16(samples);
    buf.put_slice(data);
    Ok(buf.freeze())
}
