//! Connect, retry and flush state machine
//!
//! [`Coordinator`] ties the buffers, the gates and a [`LinkSession`] into a
//! single [`tick`](Coordinator::tick) that the device main loop calls once per
//! iteration. A tick:
//!
//! 1. demotes a `Connected` phase whose link went down
//! 2. while disconnected, tries to connect when the retry gate allows it and
//!    returns early otherwise (or when the attempt fails)
//! 3. on a successful connect, pushes the identity attributes and runs the
//!    on-connect handler
//! 4. flushes telemetry and attributes when the send gate allows it
//! 5. pumps the link once
//!
//! Every failure along the way is logged and absorbed. The tick reports what
//! it did, never whether the underlying sends succeeded.

pub mod gate;
pub mod state;

pub use gate::IntervalGate;
pub use state::{SessionPhase, SessionState, NEVER};

use crate::buffer::{KeyValueBuffer, Value};
use crate::clock::Clock;
use crate::config::{BufferLimits, DeviceConfig, DeviceIdentity, SessionConfig};
use crate::error::TelemetryError;
use crate::transport::LinkSession;
use tracing::{debug, info, warn, Instrument};

/// Handler invoked synchronously after every successful connect
pub type ConnectHandler = Box<dyn FnMut() + Send>;

/// What a single tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// A connect attempt was made
    pub connect_attempted: bool,
    /// The link was connected when the tick finished
    pub connected: bool,
    /// Telemetry and attributes were flushed
    pub flushed: bool,
}

impl TickReport {
    /// True when the tick returned without touching the link
    pub fn is_noop(&self) -> bool {
        !self.connect_attempted && !self.connected
    }
}

/// Owner of session state, buffers and the link
pub struct Coordinator<L, C> {
    identity: DeviceIdentity,
    config: SessionConfig,
    telemetry_budget: usize,
    telemetry: KeyValueBuffer,
    attributes: KeyValueBuffer,
    state: SessionState,
    retry_gate: IntervalGate,
    flush_gate: IntervalGate,
    link: L,
    clock: C,
    on_connect: Option<ConnectHandler>,
}

impl<L, C> Coordinator<L, C>
where
    L: LinkSession,
    C: Clock,
{
    pub fn new(
        identity: DeviceIdentity,
        config: SessionConfig,
        limits: BufferLimits,
        link: L,
        clock: C,
    ) -> Self {
        Self {
            identity,
            retry_gate: IntervalGate::new(config.retry_interval_ms),
            flush_gate: IntervalGate::new(config.send_interval_ms),
            config,
            telemetry_budget: limits.telemetry_budget_bytes,
            telemetry: KeyValueBuffer::telemetry(limits.telemetry_capacity),
            attributes: KeyValueBuffer::attributes(limits.attribute_capacity),
            state: SessionState::new(),
            link,
            clock,
            on_connect: None,
        }
    }

    /// Build a coordinator from a loaded device configuration
    pub fn from_config(config: &DeviceConfig, link: L, clock: C) -> Self {
        Self::new(
            config.device.clone(),
            config.session.clone(),
            config.buffers.clone(),
            link,
            clock,
        )
    }

    /// Run one evaluation of the state machine
    pub async fn tick(&mut self) -> TickReport {
        let now = self.clock.now_millis();
        let span = crate::tick_span!(now, phase = ?self.state.phase);
        self.run_tick(now).instrument(span).await
    }

    async fn run_tick(&mut self, now: u32) -> TickReport {
        let mut report = TickReport::default();

        if !self.link.is_connected() {
            if self.state.phase == SessionPhase::Connected {
                warn!(endpoint = %self.config.endpoint, "Link to endpoint lost");
                self.state.phase = SessionPhase::Disconnected;
            }

            if !self.retry_gate.permits(now, self.state.last_connect_attempt) {
                // Not time to retry yet
                return report;
            }

            report.connect_attempted = true;
            if !self.connect(now).await {
                return report;
            }
        } else if self.state.phase != SessionPhase::Connected {
            self.state.phase = SessionPhase::Connected;
        }

        report.connected = true;

        if self.flush_gate.permits(now, self.state.last_flush) {
            self.flush().await;
            self.state.record_flush(now);
            report.flushed = true;
        }

        self.link.pump().await;
        report
    }

    /// Attempt a connect, returning whether the session is up
    async fn connect(&mut self, now: u32) -> bool {
        self.state.phase = SessionPhase::Connecting;
        self.state.record_connect_attempt(now);

        info!(endpoint = %self.config.endpoint, "Connecting to telemetry endpoint");
        debug!(
            token_set = !self.config.token.is_empty(),
            local_ip = %self.config.local_ip,
            "Session settings"
        );

        match self
            .link
            .connect(&self.config.endpoint, &self.config.token)
            .await
        {
            Ok(()) => {
                self.state.phase = SessionPhase::Connected;
                info!(endpoint = %self.config.endpoint, "Connected to telemetry endpoint");
                self.push_identity().await;
                if let Some(handler) = self.on_connect.as_mut() {
                    handler();
                }
                true
            }
            Err(e) => {
                self.state.phase = SessionPhase::Disconnected;
                let error = TelemetryError::ConnectFailure(e);
                warn!(
                    retry_in_secs = self.retry_gate.interval_ms() / 1000,
                    "{}", error
                );
                false
            }
        }
    }

    async fn push_identity(&mut self) {
        let identity = [
            ("app_code", self.identity.app_code.clone()),
            ("app_version", self.identity.app_version.clone()),
            ("device_chip_id", self.identity.chip_id_hex()),
            ("device_local_ip", self.config.local_ip.clone()),
        ];

        for (key, value) in identity {
            if let Err(e) = self.link.send_attribute_text(key, &value).await {
                warn!("{}", TelemetryError::send_failure(key, e));
            }
        }
    }

    async fn flush(&mut self) {
        info!(
            telemetry = self.telemetry.len(),
            attributes = self.attributes.len(),
            "Sending data to endpoint"
        );

        let snapshot = self.telemetry.encode_within_budget(self.telemetry_budget);
        if let Some(overflow) = snapshot.overflow(self.telemetry_budget) {
            warn!(dropped = ?snapshot.dropped, "{}", overflow);
        }
        if let Err(e) = self.link.send_telemetry(&snapshot.payload).await {
            warn!("{}", TelemetryError::send_failure("telemetry", e));
        }

        for (key, value) in self.attributes.iter() {
            let result = match value {
                Value::Text(text) => self.link.send_attribute_text(key, text).await,
                Value::Integer(number) => self.link.send_attribute_int(key, *number).await,
            };
            if let Err(e) = result {
                warn!("{}", TelemetryError::send_failure(key, e));
            }
        }
    }

    /// Disconnect the link, for use on shutdown
    pub async fn shutdown(&mut self) {
        self.link.disconnect().await;
        self.state.phase = SessionPhase::Disconnected;
        info!("Coordinator shut down");
    }

    /// Buffer a telemetry value; ignored (and logged) if the buffer is full
    pub fn set_telemetry<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<Value>,
    {
        if let Err(e) = self.telemetry.upsert(key, value) {
            warn!("{}", e);
        }
    }

    /// Buffer an attribute value; ignored (and logged) if the buffer is full
    pub fn set_attribute<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<Value>,
    {
        if let Err(e) = self.attributes.upsert(key, value) {
            warn!("{}", e);
        }
    }

    /// Register the handler run after each successful connect, replacing any previous one
    pub fn set_on_connect<F>(&mut self, handler: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.on_connect = Some(Box::new(handler));
    }

    pub fn set_endpoint<S: Into<String>>(&mut self, endpoint: S) {
        self.config.endpoint = endpoint.into();
    }

    pub fn set_token<S: Into<String>>(&mut self, token: S) {
        self.config.token = token.into();
    }

    pub fn set_local_ip<S: Into<String>>(&mut self, local_ip: S) {
        self.config.local_ip = local_ip.into();
    }

    pub fn set_retry_interval(&mut self, interval_ms: u32) {
        self.config.retry_interval_ms = interval_ms;
        self.retry_gate = IntervalGate::new(interval_ms);
    }

    pub fn set_send_interval(&mut self, interval_ms: u32) {
        self.config.send_interval_ms = interval_ms;
        self.flush_gate = IntervalGate::new(interval_ms);
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn telemetry(&self) -> &KeyValueBuffer {
        &self.telemetry
    }

    pub fn attributes(&self) -> &KeyValueBuffer {
        &self.attributes
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }
}
