use infrastructure::meter;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::core::time::{DateTime, Duration};
use crate::core::{Appliance, Notifier, Telemetry, TelemetryPublisher, TelemetrySource};

use super::{Alert, ControlConfig, ControlState, NotificationGateway, decide};

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub cycles: u32,
    pub elapsed: Duration,
    pub state: ControlState,
}

pub struct ControlLoop<S, P, A, N>
where
    S: TelemetrySource,
    P: TelemetryPublisher,
    A: Appliance,
    N: Notifier,
{
    device_id: String,
    config: ControlConfig,
    source: S,
    publisher: P,
    appliance: A,
    gateway: NotificationGateway<N>,
}

impl<S, P, A, N> ControlLoop<S, P, A, N>
where
    S: TelemetrySource,
    P: TelemetryPublisher,
    A: Appliance,
    N: Notifier,
{
    pub fn new(
        device_id: impl Into<String>,
        config: ControlConfig,
        source: S,
        publisher: P,
        appliance: A,
        gateway: NotificationGateway<N>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            config,
            source,
            publisher,
            appliance,
            gateway,
        }
    }

    //Returns when the cycle budget is used up or shutdown was requested. Shutdown
    //only interrupts the sleep between cycles, never a call in flight.
    pub async fn run(self, shutdown: CancellationToken) -> RunSummary {
        let started_at = Instant::now();
        let mut state = self.start().await;
        let mut cycles = 0;

        tracing::info!(
            "Starting control loop for {} with window {} polling every {}",
            self.device_id,
            self.config.schedule(),
            self.config.poll_interval
        );

        while !shutdown.is_cancelled() {
            cycles += 1;
            let cycle_started = Instant::now();
            self.run_cycle(cycles, &mut state).await;
            meter::observe_duration("cycle_duration", cycle_started.elapsed(), &[]);

            if self.budget_exhausted(cycles, started_at) {
                tracing::info!("Cycle budget exhausted after {} cycles", cycles);
                break;
            }

            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Shutdown requested, stopping control loop");
                },
                _ = tokio::time::sleep(self.config.poll_interval.clone().into()) => {},
            }
        }

        let elapsed = Duration::millis(started_at.elapsed().as_millis() as i64);
        self.gateway
            .notify(
                &Alert::Stopped {
                    cycles,
                    elapsed: elapsed.clone(),
                },
                DateTime::now(),
                &mut state,
            )
            .await;

        RunSummary { cycles, elapsed, state }
    }

    async fn start(&self) -> ControlState {
        let appliance_on = match self.appliance.get_state().await {
            Ok(on) => on,
            Err(e) => {
                tracing::warn!(
                    device_id = %self.device_id,
                    error = %e,
                    "Error reading appliance state at start, assuming OFF"
                );
                false
            }
        };

        let mut state = ControlState::new(appliance_on);
        self.gateway
            .notify(&Alert::Started { appliance_on }, DateTime::now(), &mut state)
            .await;

        state
    }

    #[tracing::instrument(skip_all, fields(cycle = cycle, device_id = %self.device_id))]
    async fn run_cycle(&self, cycle: u32, state: &mut ControlState) {
        meter::increment("cycles", &[]);

        let telemetry = match self.source.fetch(&self.device_id).await {
            Ok(telemetry) => telemetry,
            Err(e) => {
                tracing::warn!(
                    cycle,
                    device_id = %self.device_id,
                    error_kind = e.kind(),
                    error = %e,
                    "No telemetry this cycle, skipping decision"
                );
                meter::increment("telemetry_errors", &[("kind", e.kind())]);
                return;
            }
        };

        record_gauges(&telemetry);

        if let Err(e) = self.publisher.publish(&telemetry).await {
            tracing::warn!(
                cycle,
                device_id = %self.device_id,
                error_kind = "publish",
                error = %e,
                "Error publishing telemetry"
            );
        }

        let now = DateTime::now();
        let decision = decide(&telemetry, now, state, &self.config);
        state.override_active = decision.override_active;

        let switched = self.actuate(cycle, decision.appliance_on, state).await;

        for alert in decision.alerts.iter() {
            self.gateway.notify(alert, now, state).await;
        }

        if let Some(on) = switched {
            self.gateway.notify(&Alert::ApplianceSwitched { on }, now, state).await;
        }
    }

    //Commands the appliance only if its live state differs. Returns the new state when switched.
    async fn actuate(&self, cycle: u32, desired: bool, state: &mut ControlState) -> Option<bool> {
        let live = match self.appliance.get_state().await {
            Ok(live) => live,
            Err(e) => {
                tracing::warn!(
                    cycle,
                    device_id = %self.device_id,
                    error_kind = "device",
                    error = %e,
                    "Error reading appliance state, retrying next cycle"
                );
                return None;
            }
        };

        if live != state.appliance_on {
            tracing::info!("Appliance was switched externally to {}", on_off(live));
            state.appliance_on = live;
        }

        if live == desired {
            return None;
        }

        match self.appliance.set_state(desired).await {
            Ok(reported) if reported == desired => {
                tracing::info!(cycle, "Switched appliance {}", on_off(desired));
                state.appliance_on = reported;
                Some(reported)
            }
            Ok(reported) => {
                tracing::warn!(
                    cycle,
                    device_id = %self.device_id,
                    error_kind = "device",
                    "Appliance reports {} after switching {}",
                    on_off(reported),
                    on_off(desired)
                );
                state.appliance_on = reported;
                None
            }
            Err(e) => {
                tracing::warn!(
                    cycle,
                    device_id = %self.device_id,
                    error_kind = "device",
                    error = %e,
                    "Error switching appliance {}, keeping previous state",
                    on_off(desired)
                );
                None
            }
        }
    }

    fn budget_exhausted(&self, cycles: u32, started_at: Instant) -> bool {
        let cycles_exhausted = self.config.max_cycles.is_some_and(|max| cycles >= max);
        let runtime_exhausted = self
            .config
            .max_runtime
            .as_ref()
            .is_some_and(|max| started_at.elapsed() >= max.clone().into());

        cycles_exhausted || runtime_exhausted
    }
}

fn record_gauges(telemetry: &Telemetry) {
    let device = [("device_id", telemetry.device_id.as_str())];
    meter::set("state_of_charge", telemetry.state_of_charge.into(), &device);
    meter::set("watts_in", telemetry.watts_in.into(), &device);
    meter::set("watts_out", telemetry.watts_out.into(), &device);
}

fn on_off(on: bool) -> &'static str {
    if on { "ON" } else { "OFF" }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::control::fixture::config;
    use crate::control::notification::fake::RecordingNotifier;
    use crate::core::telemetry::fixture::telemetry;
    use crate::core::time::FIXED_NOW;
    use crate::error::{DeviceError, PublishError, TelemetryError};

    struct QueuedSource {
        responses: Mutex<VecDeque<Result<Telemetry, TelemetryError>>>,
    }

    impl QueuedSource {
        fn new(responses: Vec<Result<Telemetry, TelemetryError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    impl TelemetrySource for QueuedSource {
        async fn fetch(&self, _: &str) -> Result<Telemetry, TelemetryError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(TelemetryError::MissingField("pd.soc")))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingPublisher {
        published: Arc<Mutex<Vec<Telemetry>>>,
        failing: bool,
    }

    impl TelemetryPublisher for RecordingPublisher {
        async fn publish(&self, telemetry: &Telemetry) -> Result<(), PublishError> {
            if self.failing {
                return Err(PublishError::Webhook("broker down".to_owned()));
            }
            self.published.lock().unwrap().push(telemetry.clone());
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct FakeAppliance {
        on: Arc<Mutex<bool>>,
        get_calls: Arc<Mutex<u32>>,
        set_calls: Arc<Mutex<Vec<bool>>>,
        failing_set: bool,
    }

    impl FakeAppliance {
        fn with_state(on: bool) -> Self {
            let appliance = Self::default();
            *appliance.on.lock().unwrap() = on;
            appliance
        }

        fn set_calls(&self) -> Vec<bool> {
            self.set_calls.lock().unwrap().clone()
        }
    }

    impl Appliance for FakeAppliance {
        async fn get_state(&self) -> Result<bool, DeviceError> {
            *self.get_calls.lock().unwrap() += 1;
            Ok(*self.on.lock().unwrap())
        }

        async fn set_state(&self, on: bool) -> Result<bool, DeviceError> {
            self.set_calls.lock().unwrap().push(on);
            if self.failing_set {
                return Err(DeviceError::UnexpectedResponse("timeout".to_owned()));
            }
            *self.on.lock().unwrap() = on;
            Ok(on)
        }
    }

    struct Harness {
        appliance: FakeAppliance,
        publisher: RecordingPublisher,
        notifier: RecordingNotifier,
    }

    impl Harness {
        fn new(appliance: FakeAppliance) -> Self {
            Self {
                appliance,
                publisher: RecordingPublisher::default(),
                notifier: RecordingNotifier::default(),
            }
        }

        fn control_loop(
            &self,
            max_cycles: u32,
            responses: Vec<Result<Telemetry, TelemetryError>>,
        ) -> ControlLoop<QueuedSource, RecordingPublisher, FakeAppliance, RecordingNotifier> {
            let mut config = config();
            config.max_cycles = Some(max_cycles);
            let gateway = NotificationGateway::new(self.notifier.clone(), config.alert_cooldown.clone());

            ControlLoop::new(
                "R611ZAB6XG7J1240",
                config,
                QueuedSource::new(responses),
                self.publisher.clone(),
                self.appliance.clone(),
                gateway,
            )
        }
    }

    fn at(iso: &str) -> DateTime {
        DateTime::from_iso("2025-06-01T12:00:00Z")
            .unwrap()
            .at(iso.parse().unwrap())
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn low_battery_in_window_switches_on_and_alerts_once() {
        let harness = Harness::new(FakeAppliance::with_state(false));
        let control_loop = harness.control_loop(3, vec![Ok(telemetry(25.0, 50.0)), Ok(telemetry(25.0, 50.0)), Ok(telemetry(25.0, 50.0))]);

        let summary = FIXED_NOW
            .scope(at("10:00"), control_loop.run(CancellationToken::new()))
            .await;

        assert_eq!(summary.cycles, 3);
        assert!(summary.state.appliance_on);
        assert!(summary.state.override_active);
        assert_eq!(harness.appliance.set_calls(), vec![true]);
        assert_eq!(harness.publisher.published.lock().unwrap().len(), 3);

        let messages = harness.notifier.messages();
        assert_eq!(messages.len(), 4, "{:?}", messages);
        assert!(messages[0].starts_with("Power station control started"));
        assert!(messages[1].starts_with("Override active"));
        assert_eq!(messages[2], "Appliance switched ON");
        assert!(messages[3].starts_with("Power station control stopped after 3 cycles"));
    }

    #[tokio::test(start_paused = true)]
    async fn healthy_readings_in_window_switch_off() {
        let harness = Harness::new(FakeAppliance::with_state(true));
        let control_loop = harness.control_loop(1, vec![Ok(telemetry(80.0, 300.0))]);

        let summary = FIXED_NOW
            .scope(at("10:00"), control_loop.run(CancellationToken::new()))
            .await;

        assert!(!summary.state.appliance_on);
        assert!(!summary.state.override_active);
        assert_eq!(harness.appliance.set_calls(), vec![false]);
    }

    #[tokio::test(start_paused = true)]
    async fn matching_live_state_sends_no_command() {
        let harness = Harness::new(FakeAppliance::with_state(true));
        let control_loop = harness.control_loop(2, vec![Ok(telemetry(80.0, 300.0)), Ok(telemetry(80.0, 300.0))]);

        let summary = FIXED_NOW
            .scope(at("20:00"), control_loop.run(CancellationToken::new()))
            .await;

        assert!(summary.state.appliance_on);
        assert!(harness.appliance.set_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_telemetry_leaves_state_unchanged_and_skips_appliance() {
        let harness = Harness::new(FakeAppliance::with_state(true));
        let control_loop = harness.control_loop(
            2,
            vec![
                Err(TelemetryError::MissingField("pd.soc")),
                Err(TelemetryError::Api {
                    code: "8521".to_owned(),
                    message: "signature is wrong".to_owned(),
                }),
            ],
        );

        let summary = FIXED_NOW
            .scope(at("10:00"), control_loop.run(CancellationToken::new()))
            .await;

        assert_eq!(summary.cycles, 2);
        assert_eq!(summary.state, ControlState::new(true));
        //only the initial state read at start
        assert_eq!(*harness.appliance.get_calls.lock().unwrap(), 1);
        assert!(harness.appliance.set_calls().is_empty());
        assert!(harness.publisher.published.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn device_error_keeps_previous_state_and_retries_next_cycle() {
        let mut appliance = FakeAppliance::with_state(true);
        appliance.failing_set = true;
        let harness = Harness::new(appliance);
        let control_loop = harness.control_loop(2, vec![Ok(telemetry(80.0, 300.0)), Ok(telemetry(80.0, 300.0))]);

        let summary = FIXED_NOW
            .scope(at("10:00"), control_loop.run(CancellationToken::new()))
            .await;

        assert_eq!(summary.cycles, 2);
        assert!(summary.state.appliance_on);
        assert_eq!(harness.appliance.set_calls(), vec![false, false]);
        assert!(!harness.notifier.messages().iter().any(|m| m.starts_with("Appliance switched")));
    }

    #[tokio::test(start_paused = true)]
    async fn publish_failure_does_not_stop_decision() {
        let mut harness = Harness::new(FakeAppliance::with_state(true));
        harness.publisher.failing = true;
        let control_loop = harness.control_loop(1, vec![Ok(telemetry(80.0, 300.0))]);

        let summary = FIXED_NOW
            .scope(at("10:00"), control_loop.run(CancellationToken::new()))
            .await;

        assert!(!summary.state.appliance_on);
        assert_eq!(harness.appliance.set_calls(), vec![false]);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_sleep_between_cycles() {
        let harness = Harness::new(FakeAppliance::with_state(true));
        let mut control_loop = harness.control_loop(100, vec![Ok(telemetry(80.0, 300.0))]);
        control_loop.config.poll_interval = Duration::hours(1);
        let shutdown = CancellationToken::new();
        let started = Instant::now();

        let (summary, _) = tokio::join!(
            FIXED_NOW.scope(at("20:00"), control_loop.run(shutdown.clone())),
            async {
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                shutdown.cancel();
            }
        );

        assert_eq!(summary.cycles, 1);
        assert!(started.elapsed() < std::time::Duration::from_secs(60));
        assert!(
            harness
                .notifier
                .messages()
                .last()
                .is_some_and(|m| m.starts_with("Power station control stopped after 1 cycles"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn runtime_budget_ends_loop() {
        let harness = Harness::new(FakeAppliance::with_state(true));
        let mut control_loop = harness.control_loop(1000, vec![]);
        control_loop.config.max_cycles = None;
        control_loop.config.max_runtime = Some(Duration::minutes(5));

        let summary = FIXED_NOW
            .scope(at("20:00"), control_loop.run(CancellationToken::new()))
            .await;

        //cycles at 0, 1, 2, 3, 4 and 5 minutes
        assert_eq!(summary.cycles, 6);
        assert!(summary.elapsed >= Duration::minutes(5));
    }
}
