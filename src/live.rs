//! ==============================================================================
//! live.rs - websocket delta subscriber
//! ==============================================================================
//!
//! purpose:
//!     keeps one push channel open to `<base>/ws` and turns its lifecycle into
//!     a stream of `ChannelEvent`s. decoding and merging of the frames happens
//!     in state.rs so that this module only deals with the socket.
//!
//! lifecycle:
//!     connect ok      -> Opened
//!     text frame      -> Message(text)
//!     close / eof     -> Closed
//!     socket error    -> Error(reason)
//!     cancel token    -> close frame sent, Closed
//!
//!     there is no reconnect. once Closed/Error is emitted the subscriber
//!     returns and the dashboard stays offline until a new session is started.
//!
//! ==============================================================================

use crate::error::{DashError, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::UnboundedSender;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// everything the live channel can report
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Opened,
    Message(String),
    Closed,
    Error(String),
}

/// http(s)://host[/prefix] -> ws(s)://host[/prefix]/ws
pub fn ws_url(base: &Url) -> Result<Url> {
    let mut url = base.clone();

    match url.scheme() {
        "http" => url
            .set_scheme("ws")
            .map_err(|_| DashError::invalid_url("failed to convert http to ws"))?,
        "https" => url
            .set_scheme("wss")
            .map_err(|_| DashError::invalid_url("failed to convert https to wss"))?,
        other => {
            return Err(DashError::invalid_url(format!(
                "unsupported scheme for websocket: {other}"
            )))
        }
    }

    let path = format!("{}/ws", url.path().trim_end_matches('/'));
    url.set_path(&path);
    Ok(url)
}

pub struct LiveSubscriber {
    url: Url,
}

impl LiveSubscriber {
    pub fn new(base: &Url) -> Result<Self> {
        Ok(Self { url: ws_url(base)? })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// runs until the channel drops or `cancel` fires; every exit path emits
    /// exactly one terminal event (Closed or Error)
    pub async fn run(self, events: UnboundedSender<ChannelEvent>, cancel: CancellationToken) {
        let emit = |event: ChannelEvent| {
            // receiver gone means the session is being torn down
            let _ = events.send(event);
        };

        let connected = tokio::select! {
            _ = cancel.cancelled() => {
                emit(ChannelEvent::Closed);
                return;
            }
            result = connect_async(self.url.as_str()) => result,
        };

        let stream = match connected {
            Ok((stream, response)) => {
                info!(url = %self.url, status = %response.status(), "live channel open");
                emit(ChannelEvent::Opened);
                stream
            }
            Err(e) => {
                let err = DashError::from(e);
                warn!(url = %self.url, error = %err, "live channel failed to connect");
                emit(ChannelEvent::Error(err.to_string()));
                return;
            }
        };

        let (mut write, mut read) = stream.split();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!(error = %e, "close frame not delivered");
                    }
                    emit(ChannelEvent::Closed);
                    return;
                }
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => emit(ChannelEvent::Message(text)),
                    Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                        Ok(text) => emit(ChannelEvent::Message(text)),
                        Err(_) => warn!("ignoring non-utf8 binary frame"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        match frame {
                            Some(f) => info!(code = %f.code, reason = %f.reason, "live channel closed by server"),
                            None => info!("live channel closed by server"),
                        }
                        emit(ChannelEvent::Closed);
                        return;
                    }
                    // ping/pong are answered by tungstenite
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "live channel error");
                        emit(ChannelEvent::Error(e.to_string()));
                        return;
                    }
                    None => {
                        info!("live channel stream ended");
                        emit(ChannelEvent::Closed);
                        return;
                    }
                },
            }
        }
    }
}
