//! Message contract of the voice proxy channel.
//!
//! The proxy is a WebSocket-shaped duplex channel that relays JSON messages
//! between the browser and a remote conversational voice service. This
//! module models its outbound messages, lifecycle notifications and
//! connection state; the transport itself is supplied by the host.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::{FeedError, Result};

/// Messages sent through the proxy, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProxyOutbound {
    /// Base64 encoded audio chunk.
    AudioInput { data: String },
    UserInput { text: String },
    SessionSettings { settings: serde_json::Value },
}

impl ProxyOutbound {
    pub fn audio_input(bytes: &[u8]) -> Self {
        ProxyOutbound::AudioInput {
            data: STANDARD.encode(bytes),
        }
    }

    pub fn user_input(text: impl Into<String>) -> Self {
        ProxyOutbound::UserInput { text: text.into() }
    }

    /// Raw audio carried by an `audio_input` message.
    pub fn decode_audio(&self) -> Result<Option<Vec<u8>>> {
        match self {
            ProxyOutbound::AudioInput { data } => STANDARD
                .decode(data)
                .map(Some)
                .map_err(|err| FeedError::msg(format!("invalid base64 audio: {err}"))),
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Open,
    Closed,
}

/// Lifecycle notifications surfaced to the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProxyNotice {
    ProxyStatus {
        status: ConnectionStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<u16>,
    },
    ProxyError {
        message: String,
    },
}

/// Something that arrived from the proxy.
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyInbound {
    Notice(ProxyNotice),
    /// Forwarded opaquely.
    Message(serde_json::Value),
}

#[derive(Debug, Clone)]
pub struct VoiceProxyChannel {
    endpoint: Url,
    status: ConnectionStatus,
}

impl VoiceProxyChannel {
    /// Validates the endpoint; only `ws` and `wss` URLs are accepted.
    pub fn new(endpoint: &str) -> Result<Self> {
        let url = Url::parse(endpoint).map_err(|_| FeedError::InvalidEndpoint(endpoint.to_string()))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(FeedError::InvalidEndpoint(endpoint.to_string()));
        }
        Ok(Self {
            endpoint: url,
            status: ConnectionStatus::Disconnected,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn connect(&mut self) -> ProxyNotice {
        info!(endpoint = %self.endpoint, "connecting to voice proxy");
        self.set_status(ConnectionStatus::Connecting, None)
    }

    pub fn on_open(&mut self) -> ProxyNotice {
        self.set_status(ConnectionStatus::Open, None)
    }

    pub fn on_close(&mut self, code: u16) -> ProxyNotice {
        info!(code, "voice proxy closed");
        self.set_status(ConnectionStatus::Closed, Some(code))
    }

    pub fn on_error(&mut self, message: impl Into<String>) -> ProxyNotice {
        let message = message.into();
        warn!(%message, "voice proxy error");
        ProxyNotice::ProxyError { message }
    }

    /// Parses an inbound frame. Frames that are not JSON surface as a
    /// `proxy_error` notice instead of failing.
    pub fn on_message(&mut self, raw: &str) -> ProxyInbound {
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(value) => ProxyInbound::Message(value),
            Err(err) => ProxyInbound::Notice(self.on_error(format!("malformed proxy frame: {err}"))),
        }
    }

    /// Serializes `message` for sending. Fails unless the channel is open.
    pub fn encode(&self, message: &ProxyOutbound) -> Result<String> {
        if self.status != ConnectionStatus::Open {
            return Err(FeedError::ProxyNotOpen);
        }
        Ok(serde_json::to_string(message)?)
    }

    fn set_status(&mut self, status: ConnectionStatus, code: Option<u16>) -> ProxyNotice {
        debug!(from = ?self.status, to = ?status, "voice proxy status");
        self.status = status;
        ProxyNotice::ProxyStatus { status, code }
    }
}
