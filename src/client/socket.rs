//! Explicit connection handle. Callers construct one and pass it around;
//! there is no module-level socket singleton.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::error::AppResult;
use crate::proto::{ClientEvent, ServerEvent};

pub struct ChatSocket {
    out: mpsc::UnboundedSender<String>,
}

impl ChatSocket {
    /// Connect and spawn the two pumps. Returns the handle plus the stream
    /// of decoded server events. A dropped connection simply ends the
    /// stream — no retries, no timeouts.
    pub async fn connect(url: &str) -> AppResult<(Self, mpsc::UnboundedReceiver<ServerEvent>)> {
        let (ws, _) = connect_async(url).await?;
        let (mut write, mut read) = ws.split();

        let (out, mut out_rx) = mpsc::unbounded_channel::<String>();
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                if write.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
        });

        let (events, events_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(Ok(msg)) = read.next().await {
                let Message::Text(text) = msg else { continue };
                match serde_json::from_str::<ServerEvent>(&text) {
                    Ok(ev) => {
                        if events.send(ev).is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::debug!("ignoring frame: {e}"),
                }
            }
            tracing::debug!("socket read pump ended");
        });

        Ok((Self { out }, events_rx))
    }

    /// Queue a frame for sending. Returns false once the connection is gone;
    /// failed emits are not retried.
    pub fn emit(&self, ev: &ClientEvent) -> bool {
        match serde_json::to_string(ev) {
            Ok(frame) => self.out.send(frame).is_ok(),
            Err(e) => {
                tracing::debug!("emit encode failed: {e}");
                false
            }
        }
    }

    pub fn is_open(&self) -> bool {
        !self.out.is_closed()
    }

    #[cfg(test)]
    pub(crate) fn from_channel(out: mpsc::UnboundedSender<String>) -> Self {
        Self { out }
    }
}
