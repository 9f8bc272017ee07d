// Source seam - how sample feeds talk to the engine
use crate::infrastructure::wire::WireMessage;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Events a source pushes into the engine's single event queue.
#[derive(Debug)]
pub enum SourceEvent {
    /// Handshake with the feed succeeded.
    Opened,
    /// A parsed wire message; malformed payloads are dropped by the source.
    Message(WireMessage),
    /// The feed closed. `error` distinguishes faults from clean closes; the
    /// supervisor treats both the same way. `generation` identifies which
    /// link attempt the report belongs to, so a close queued by a link that
    /// has since been replaced is dropped instead of tearing down its
    /// successor. Sources signal closure by returning from `run`; the engine
    /// attaches the generation itself.
    Closed { error: bool, generation: u64 },
}

/// Directives the engine sends back down to a running source.
#[derive(Debug)]
pub enum SourceControl {
    /// Serialize and transmit a message (heartbeat pings, pong replies).
    Send(WireMessage),
}

/// A live feed the engine can attach to. One `run` call covers one
/// connection attempt: it resolves when the feed closes, errs when the
/// connection fails or faults.
#[async_trait]
pub trait SampleSource: Send + Sync {
    async fn run(
        &self,
        events: mpsc::Sender<SourceEvent>,
        control: mpsc::Receiver<SourceControl>,
    ) -> anyhow::Result<()>;
}
