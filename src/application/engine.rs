// Telemetry engine - single-writer event loop owning all mutable state
use crate::application::aggregate::aggregate;
use crate::application::buffer::SampleBuffer;
use crate::application::connection::{ConnectionSupervisor, LossDecision};
use crate::application::downsample::{DownsampleStrategy, downsample};
use crate::application::source::{SampleSource, SourceControl, SourceEvent};
use crate::application::viewport::{Domain, ViewportController, ZoomDirection};
use crate::domain::connection::ConnectionState;
use crate::domain::sample::{AggregateReport, Channel, Sample, SeriesVisibility};
use crate::error::EngineError;
use crate::infrastructure::config::{EngineConfig, MissingChannelPolicy};
use crate::infrastructure::live_source::LiveSource;
use crate::infrastructure::synthetic::SyntheticGenerator;
use crate::infrastructure::wire::{PointPayload, WireMessage};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval, sleep_until};

/// Connection status plus the rest of the state the dashboard shows.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub state: ConnectionState,
    pub latency_ms: Option<f64>,
    pub playing: bool,
    pub follow: bool,
    pub buffer_len: usize,
    pub sample_rate_hz: f64,
    pub visibility: SeriesVisibility,
}

enum EngineCommand {
    TogglePlayback { reply: oneshot::Sender<bool> },
    Clear,
    ToggleSeries { channel: Channel, reply: oneshot::Sender<SeriesVisibility> },
    Zoom { cursor: f64, direction: ZoomDirection, reply: oneshot::Sender<Option<Domain>> },
    Pan { delta_fraction: f64, reply: oneshot::Sender<Option<Domain>> },
    ResetView { reply: oneshot::Sender<Option<Domain>> },
    ToggleFollow { reply: oneshot::Sender<bool> },
    Reconnect,
    Status { reply: oneshot::Sender<EngineStatus> },
    DomainQuery { reply: oneshot::Sender<Option<Domain>> },
    Snapshot { reply: oneshot::Sender<Vec<Sample>> },
    Visible { range: Option<(f64, f64)>, reply: oneshot::Sender<Vec<Sample>> },
    Render {
        range: Option<(f64, f64)>,
        budget: Option<usize>,
        strategy: Option<DownsampleStrategy>,
        reply: oneshot::Sender<Vec<Sample>>,
    },
    Metrics { reply: oneshot::Sender<AggregateReport> },
    Shutdown,
}

/// Cloneable front door to the engine task. All reads and writes funnel
/// through the command channel, so observers never see a partial flush.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    async fn request<T>(
        &self,
        command: EngineCommand,
        reply: oneshot::Receiver<T>,
    ) -> Result<T, EngineError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| EngineError::Closed)?;
        reply.await.map_err(|_| EngineError::Closed)
    }

    pub async fn status(&self) -> Result<EngineStatus, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.request(EngineCommand::Status { reply: tx }, rx).await
    }

    pub async fn domain(&self) -> Result<Option<Domain>, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.request(EngineCommand::DomainQuery { reply: tx }, rx).await
    }

    /// Read-only copy of the whole buffered history.
    pub async fn snapshot(&self) -> Result<Vec<Sample>, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.request(EngineCommand::Snapshot { reply: tx }, rx).await
    }

    /// Samples inside `range`, defaulting to the current domain.
    pub async fn visible(&self, range: Option<(f64, f64)>) -> Result<Vec<Sample>, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.request(EngineCommand::Visible { range, reply: tx }, rx).await
    }

    /// Visible samples reduced to the rendering budget when they exceed the
    /// decimation threshold.
    pub async fn render(
        &self,
        range: Option<(f64, f64)>,
        budget: Option<usize>,
        strategy: Option<DownsampleStrategy>,
    ) -> Result<Vec<Sample>, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.request(
            EngineCommand::Render {
                range,
                budget,
                strategy,
                reply: tx,
            },
            rx,
        )
        .await
    }

    /// Aggregates over the currently visible range under the series mask.
    pub async fn metrics(&self) -> Result<AggregateReport, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.request(EngineCommand::Metrics { reply: tx }, rx).await
    }

    /// Returns the new playback flag.
    pub async fn toggle_playback(&self) -> Result<bool, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.request(EngineCommand::TogglePlayback { reply: tx }, rx).await
    }

    pub async fn clear(&self) -> Result<(), EngineError> {
        self.commands
            .send(EngineCommand::Clear)
            .await
            .map_err(|_| EngineError::Closed)
    }

    pub async fn toggle_series(&self, channel: Channel) -> Result<SeriesVisibility, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.request(EngineCommand::ToggleSeries { channel, reply: tx }, rx)
            .await
    }

    /// Invalid requests are rejected internally; the returned domain is
    /// whatever is current afterwards.
    pub async fn zoom(
        &self,
        cursor: f64,
        direction: ZoomDirection,
    ) -> Result<Option<Domain>, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.request(
            EngineCommand::Zoom {
                cursor,
                direction,
                reply: tx,
            },
            rx,
        )
        .await
    }

    pub async fn pan(&self, delta_fraction: f64) -> Result<Option<Domain>, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.request(
            EngineCommand::Pan {
                delta_fraction,
                reply: tx,
            },
            rx,
        )
        .await
    }

    pub async fn reset_view(&self) -> Result<Option<Domain>, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.request(EngineCommand::ResetView { reply: tx }, rx).await
    }

    pub async fn toggle_follow(&self) -> Result<bool, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.request(EngineCommand::ToggleFollow { reply: tx }, rx).await
    }

    /// Manual reconnect, the only way out of degraded mode.
    pub async fn reconnect(&self) -> Result<(), EngineError> {
        self.commands
            .send(EngineCommand::Reconnect)
            .await
            .map_err(|_| EngineError::Closed)
    }

    pub async fn shutdown(&self) {
        let _ = self.commands.send(EngineCommand::Shutdown).await;
    }
}

struct SourceLink {
    control: mpsc::Sender<SourceControl>,
    task: JoinHandle<()>,
    generation: u64,
}

/// Last observed value per channel, used by the carry-forward normalization
/// policy.
#[derive(Debug, Default, Clone, Copy)]
struct LastKnown {
    speed: f64,
    current: f64,
    temp: f64,
}

pub struct Engine {
    config: EngineConfig,
    buffer: SampleBuffer,
    viewport: ViewportController,
    supervisor: ConnectionSupervisor,
    generator: SyntheticGenerator,
    visibility: SeriesVisibility,
    playing: bool,
    declared_hz: f64,
    last_known: LastKnown,
    source: Option<Arc<dyn SampleSource>>,
    link: Option<SourceLink>,
    link_generation: u64,
    pending_ping: Option<f64>,
    source_events_tx: mpsc::Sender<SourceEvent>,
}

impl Engine {
    /// Spawn the engine task. With a configured feed URL the live source is
    /// attached immediately; otherwise the engine starts in synthetic demo
    /// mode.
    pub fn spawn(config: EngineConfig) -> EngineHandle {
        let source = config
            .feed_url
            .clone()
            .map(|url| Arc::new(LiveSource::new(url)) as Arc<dyn SampleSource>);
        Self::spawn_with_source(config, source)
    }

    /// Seam for tests and embedders that bring their own feed.
    pub fn spawn_with_source(
        config: EngineConfig,
        source: Option<Arc<dyn SampleSource>>,
    ) -> EngineHandle {
        let (command_tx, command_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::channel(256);

        let engine = Engine {
            buffer: SampleBuffer::new(config.buffer_capacity),
            viewport: ViewportController::new(
                config.follow_window_secs,
                config.zoom_sensitivity,
                config.min_zoom_span,
                config.y_ceiling,
            ),
            supervisor: ConnectionSupervisor::new(
                config.max_reconnect_attempts,
                config.backoff_base_ms,
                config.backoff_cap_ms,
                config.synthetic_fallback,
            ),
            generator: SyntheticGenerator::new(config.synthetic_tick_ms, config.playback_rate),
            visibility: SeriesVisibility::default(),
            playing: true,
            declared_hz: config.sample_rate_hz,
            last_known: LastKnown::default(),
            source,
            link: None,
            link_generation: 0,
            pending_ping: None,
            source_events_tx: event_tx,
            config,
        };
        tokio::spawn(engine.run(command_rx, event_rx));

        EngineHandle {
            commands: command_tx,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<EngineCommand>,
        mut source_events: mpsc::Receiver<SourceEvent>,
    ) {
        let mut flush = interval(Duration::from_millis(self.config.batch_interval_ms.max(1)));
        let mut synthetic = interval(Duration::from_millis(self.config.synthetic_tick_ms.max(1)));
        let mut heartbeat = interval(Duration::from_millis(self.config.heartbeat_interval_ms.max(1)));
        flush.set_missed_tick_behavior(MissedTickBehavior::Skip);
        synthetic.set_missed_tick_behavior(MissedTickBehavior::Skip);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Pending reconnect deadline; None means nothing scheduled. Held
        // here, not in a detached timer task, so dropping the loop cancels
        // it along with every interval above.
        let mut reconnect_at: Option<Instant> = None;

        if self.source.is_some() {
            self.start_connect();
        } else {
            self.supervisor.enter_degraded();
            tracing::info!("no feed url configured, running synthetic demo mode");
        }

        loop {
            // Instant is Copy; the future owns its own deadline so the arm
            // handlers stay free to reschedule or cancel.
            let deadline = reconnect_at;
            let reconnect_due = async move {
                match deadline {
                    Some(deadline) => sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                command = commands.recv() => match command {
                    Some(EngineCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command, &mut reconnect_at),
                },
                event = source_events.recv() => {
                    if let Some(event) = event {
                        self.handle_source_event(event, &mut reconnect_at);
                    }
                }
                _ = flush.tick() => self.flush(),
                _ = synthetic.tick(), if self.synthetic_active() => {
                    let sample = self.generator.tick();
                    self.buffer.append(sample);
                }
                _ = heartbeat.tick(), if self.supervisor.state() == ConnectionState::Connected => {
                    self.send_ping();
                }
                _ = reconnect_due => {
                    reconnect_at = None;
                    self.start_connect();
                }
            }
        }

        self.stop_source();
        self.supervisor.shutdown();
        tracing::info!("engine stopped");
    }

    fn synthetic_active(&self) -> bool {
        self.playing && self.supervisor.state() == ConnectionState::Degraded
    }

    fn handle_command(&mut self, command: EngineCommand, reconnect_at: &mut Option<Instant>) {
        match command {
            EngineCommand::TogglePlayback { reply } => {
                self.playing = !self.playing;
                tracing::info!(playing = self.playing, "playback toggled");
                let _ = reply.send(self.playing);
            }
            EngineCommand::Clear => {
                self.buffer.clear();
                self.viewport.forget();
            }
            EngineCommand::ToggleSeries { channel, reply } => {
                self.visibility.toggle(channel);
                let _ = reply.send(self.visibility);
            }
            EngineCommand::Zoom { cursor, direction, reply } => {
                if let (Some(min_t), Some(max_t)) = (self.buffer.min_t(), self.buffer.max_t()) {
                    if let Err(e) = self.viewport.zoom(cursor, direction, min_t, max_t) {
                        tracing::debug!(error = %e, "zoom rejected");
                    }
                }
                let _ = reply.send(self.viewport.domain());
            }
            EngineCommand::Pan { delta_fraction, reply } => {
                if let Some(start) = self.viewport.domain() {
                    let result = self.viewport.pan(
                        start,
                        delta_fraction,
                        self.buffer.len(),
                        self.declared_hz,
                    );
                    if let Err(e) = result {
                        tracing::debug!(error = %e, "pan rejected");
                    }
                }
                let _ = reply.send(self.viewport.domain());
            }
            EngineCommand::ResetView { reply } => {
                if let (Some(min_t), Some(max_t)) = (self.buffer.min_t(), self.buffer.max_t()) {
                    self.viewport.reset(min_t, max_t);
                }
                let _ = reply.send(self.viewport.domain());
            }
            EngineCommand::ToggleFollow { reply } => {
                let min_t = self.buffer.min_t().unwrap_or(0.0);
                let max_t = self.buffer.max_t().unwrap_or(0.0);
                let _ = reply.send(self.viewport.toggle_follow(min_t, max_t));
            }
            EngineCommand::Reconnect => {
                *reconnect_at = None;
                self.stop_source();
                self.supervisor.reconnect();
                self.start_connect();
            }
            EngineCommand::Status { reply } => {
                let _ = reply.send(EngineStatus {
                    state: self.supervisor.state(),
                    latency_ms: self.supervisor.latency_ms(),
                    playing: self.playing,
                    follow: self.viewport.follow(),
                    buffer_len: self.buffer.len(),
                    sample_rate_hz: self.declared_hz,
                    visibility: self.visibility,
                });
            }
            EngineCommand::DomainQuery { reply } => {
                let _ = reply.send(self.viewport.domain());
            }
            EngineCommand::Snapshot { reply } => {
                let _ = reply.send(self.buffer.snapshot());
            }
            EngineCommand::Visible { range, reply } => {
                let _ = reply.send(self.visible_samples(range));
            }
            EngineCommand::Render { range, budget, strategy, reply } => {
                let visible = self.visible_samples(range);
                let budget = budget.unwrap_or(self.config.downsample_budget);
                let reduced = if visible.len() > self.config.downsample_threshold {
                    downsample(
                        &visible,
                        budget,
                        strategy.unwrap_or(self.config.downsample_strategy),
                        self.config.lttb_channel,
                    )
                } else {
                    visible
                };
                let _ = reply.send(reduced);
            }
            EngineCommand::Metrics { reply } => {
                let visible = self.visible_samples(None);
                let _ = reply.send(aggregate(&visible, self.visibility));
            }
            EngineCommand::Shutdown => unreachable!("handled by the run loop"),
        }
    }

    fn handle_source_event(&mut self, event: SourceEvent, reconnect_at: &mut Option<Instant>) {
        match event {
            SourceEvent::Opened => {
                self.supervisor.on_established();
                self.pending_ping = None;
                tracing::info!("live source connected");
            }
            SourceEvent::Message(message) => self.handle_message(message),
            SourceEvent::Closed { error, generation } => {
                // A close queued by a link that was already torn down or
                // replaced must not take down its successor.
                if self.link.as_ref().map(|link| link.generation) != Some(generation) {
                    return;
                }
                self.stop_source();
                self.pending_ping = None;
                match self.supervisor.on_lost() {
                    LossDecision::Degrade => {
                        tracing::warn!(error, "live source lost, degrading to synthetic generator");
                        self.generator.resume_from(self.buffer.latest_t().unwrap_or(0.0));
                    }
                    LossDecision::Retry(delay) => {
                        tracing::info!(error, delay_ms = delay.as_millis() as u64, "scheduling reconnect");
                        *reconnect_at = Some(Instant::now() + delay);
                    }
                    LossDecision::GiveUp => {
                        tracing::warn!(error, "reconnect budget exhausted, staying disconnected");
                    }
                }
            }
        }
    }

    fn handle_message(&mut self, message: WireMessage) {
        match message {
            WireMessage::Meta { session_id, series, hz } => {
                tracing::debug!(session = %session_id, ?series, hz, "feed metadata");
                if hz.is_finite() && hz > 0.0 {
                    self.declared_hz = hz;
                }
            }
            WireMessage::Point(point) => {
                // Samples arriving while paused are discarded, not buffered.
                if !self.playing {
                    return;
                }
                if let Some(sample) = self.normalize(point) {
                    self.buffer.append(sample);
                }
            }
            WireMessage::Pong { timestamp } => {
                // Only the echo of the outstanding ping updates latency.
                if self.pending_ping != Some(timestamp) {
                    tracing::debug!(timestamp, "ignoring pong for a ping we did not send");
                    return;
                }
                self.pending_ping = None;
                let latency = now_ms() - timestamp;
                if latency.is_finite() && latency >= 0.0 {
                    self.supervisor.record_latency(latency);
                }
            }
            WireMessage::Ping { timestamp } => {
                self.send_control(WireMessage::Pong { timestamp });
            }
            WireMessage::End { reason } => {
                tracing::debug!(?reason, "feed signalled end of stream");
            }
        }
    }

    /// Normalize an incomplete point per the configured policy and remember
    /// every channel value that did arrive.
    fn normalize(&mut self, point: PointPayload) -> Option<Sample> {
        if let Some(v) = point.speed {
            self.last_known.speed = v;
        }
        if let Some(v) = point.current {
            self.last_known.current = v;
        }
        if let Some(v) = point.temp {
            self.last_known.temp = v;
        }

        if self.config.missing_channel_policy == MissingChannelPolicy::Reject {
            let missing_enabled = (point.speed.is_none() && self.visibility.speed)
                || (point.current.is_none() && self.visibility.current)
                || (point.temp.is_none() && self.visibility.temp);
            if missing_enabled {
                tracing::debug!(t = point.t, "dropping point missing an enabled channel");
                return None;
            }
        }

        Some(Sample::new(
            point.t,
            self.last_known.speed,
            self.last_known.current,
            self.last_known.temp,
        ))
    }

    fn flush(&mut self) {
        if self.buffer.flush() > 0 {
            if let (Some(min_t), Some(max_t)) = (self.buffer.min_t(), self.buffer.max_t()) {
                self.viewport.on_data(min_t, max_t);
            }
        }
    }

    fn visible_samples(&self, range: Option<(f64, f64)>) -> Vec<Sample> {
        let (lo, hi) = match range {
            Some(range) => range,
            None => match self.viewport.domain() {
                Some(domain) => (domain.x_min, domain.x_max),
                None => match (self.buffer.min_t(), self.buffer.max_t()) {
                    (Some(min_t), Some(max_t)) => (min_t, max_t),
                    _ => return Vec::new(),
                },
            },
        };
        self.buffer.visible(lo, hi)
    }

    fn start_connect(&mut self) {
        let Some(source) = self.source.clone() else {
            self.supervisor.enter_degraded();
            return;
        };
        self.supervisor.begin_connect();
        self.link_generation += 1;
        let generation = self.link_generation;

        let (control_tx, control_rx) = mpsc::channel(16);
        let events = self.source_events_tx.clone();
        let task = tokio::spawn(async move {
            let error = source.run(events.clone(), control_rx).await.is_err();
            let _ = events.send(SourceEvent::Closed { error, generation }).await;
        });
        self.link = Some(SourceLink {
            control: control_tx,
            task,
            generation,
        });
    }

    fn stop_source(&mut self) {
        if let Some(link) = self.link.take() {
            link.task.abort();
        }
    }

    fn send_ping(&mut self) {
        let timestamp = now_ms();
        self.pending_ping = Some(timestamp);
        self.send_control(WireMessage::Ping { timestamp });
    }

    fn send_control(&mut self, message: WireMessage) {
        if let Some(link) = &self.link {
            // A failed heartbeat send surfaces as a close on the link soon
            // after; nothing to do here but note it.
            if link.control.try_send(SourceControl::Send(message)).is_err() {
                tracing::debug!("control send failed, link backed up or closing");
            }
        }
    }
}

fn now_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}
