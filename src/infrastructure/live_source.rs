// WebSocket live source adapter
use crate::application::source::{SampleSource, SourceControl, SourceEvent};
use crate::infrastructure::wire::WireMessage;
use anyhow::Result;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Connects to the telemetry feed and pumps wire messages into the engine's
/// event queue. One instance is reused across reconnect attempts; each
/// attempt is one `run` call.
pub struct LiveSource {
    url: String,
}

impl LiveSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl SampleSource for LiveSource {
    async fn run(
        &self,
        events: mpsc::Sender<SourceEvent>,
        mut control: mpsc::Receiver<SourceControl>,
    ) -> Result<()> {
        let (socket, _response) = connect_async(&self.url).await?;
        if events.send(SourceEvent::Opened).await.is_err() {
            return Ok(());
        }
        let (mut writer, mut reader) = socket.split();

        loop {
            tokio::select! {
                frame = reader.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<WireMessage>(&text) {
                            Ok(message) => {
                                if events.send(SourceEvent::Message(message)).await.is_err() {
                                    return Ok(());
                                }
                            }
                            Err(e) => {
                                tracing::debug!(error = %e, "dropping malformed feed message");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    // Transport-level frames carry no telemetry.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                },
                directive = control.recv() => match directive {
                    Some(SourceControl::Send(message)) => {
                        let text = serde_json::to_string(&message)?;
                        writer.send(Message::Text(text)).await?;
                    }
                    // The engine dropped the link: clean teardown.
                    None => return Ok(()),
                },
            }
        }
    }
}
