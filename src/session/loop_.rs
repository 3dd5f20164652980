//! The single cooperative driver (C15): capture -> recognize -> decide
//! -> validate -> enqueue -> execute, one tick at a time, enforcing the
//! safety gates spec.md §4.14 names.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::action::{Action, ActionQueue};
use crate::control::executor::ActionExecutor;
use crate::decision::{DecisionSource, HybridDecisionEngine};
use crate::error::{FatalError, SafetyBlockReason};
use crate::llm::VlmClient;
use crate::session::config::SessionConfig;
use crate::state::GameState;
use crate::vision::RecognitionEngine;

/// One tick's structured observation, logged at `info` and returned to
/// callers that want to inspect it (tests, the self-check harness).
#[derive(Debug, Clone)]
pub struct TickObservation {
    pub window_size: (u32, u32),
    pub scale: (f64, f64),
    pub offset: (i32, i32),
    pub recognized_gold: Option<i32>,
    pub recognized_level: Option<i32>,
    pub recognized_shop_count: usize,
    pub action_kind: String,
    pub decision_source: DecisionSource,
    pub confidence: f64,
    pub executed: bool,
    pub safety_block: Option<SafetyBlockReason>,
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    SessionTimeout,
    Cancelled,
}

/// What a single tick produced: either an observation to log and act
/// on, or a reason the loop should stop before the next one.
#[derive(Debug, Clone)]
pub enum TickOutcome {
    Continued(TickObservation),
    Stopped(StopReason),
}

/// Final per-session totals, printed at shutdown per spec.md §7.
#[derive(Debug, Clone, Default)]
pub struct SessionSummary {
    pub ticks: u64,
    pub decisions: u64,
    pub executed: u64,
    pub errors: u64,
    pub recognition_failures: u64,
    pub safety_blocks: u64,
}

/// Rate limiter over the trailing 60-second window of execution
/// timestamps, plus a lifetime click cap.
struct SafetyGate {
    max_actions_per_min: u32,
    max_clicks: u32,
    execution_timestamps: VecDeque<Instant>,
    lifetime_clicks: u32,
}

impl SafetyGate {
    fn new(max_actions_per_min: u32, max_clicks: u32) -> Self {
        Self { max_actions_per_min, max_clicks, execution_timestamps: VecDeque::new(), lifetime_clicks: 0 }
    }

    /// Evaluates whether an execution may proceed right now, without
    /// recording it. Call `record` only after the execution actually
    /// happens.
    fn check(&mut self, now: Instant) -> Option<SafetyBlockReason> {
        self.prune(now);
        if self.lifetime_clicks >= self.max_clicks {
            return Some(SafetyBlockReason::ClickCapReached);
        }
        if self.execution_timestamps.len() as u32 >= self.max_actions_per_min {
            return Some(SafetyBlockReason::RateLimited);
        }
        None
    }

    fn record(&mut self, now: Instant) {
        self.execution_timestamps.push_back(now);
        self.lifetime_clicks += 1;
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&front) = self.execution_timestamps.front() {
            if now.duration_since(front) > Duration::from_secs(60) {
                self.execution_timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Rate-limits repeated recognition-failure log lines: logs immediately
/// on the first failure, then at most once per `cooldown`.
struct FailureLogLimiter {
    cooldown: Duration,
    last_logged: Option<Instant>,
}

impl FailureLogLimiter {
    fn new(cooldown: Duration) -> Self {
        Self { cooldown, last_logged: None }
    }

    fn should_log(&mut self, now: Instant) -> bool {
        match self.last_logged {
            Some(last) if now.duration_since(last) < self.cooldown => false,
            _ => {
                self.last_logged = Some(now);
                true
            }
        }
    }
}

/// Drives the perception-decision-execution loop. Owns every
/// subsystem; nothing here is global. `run` suspends at the adapter,
/// at template/OCR work (synchronous here, but cheap), at the VLM call
/// inside `decision_engine`, and at the inter-tick sleep — no component
/// assumes multiple concurrent ticks.
pub struct SessionLoop {
    config: SessionConfig,
    executor: ActionExecutor,
    recognition: RecognitionEngine,
    decision_engine: HybridDecisionEngine,
    action_queue: ActionQueue,
    vlm_client: Option<VlmClient>,
    state: GameState,
    safety_gate: SafetyGate,
    failure_limiter: FailureLogLimiter,
    started_at: Option<Instant>,
    cancelled: std::sync::Arc<std::sync::atomic::AtomicBool>,
    summary: SessionSummary,
}

impl SessionLoop {
    pub fn new(
        config: SessionConfig,
        executor: ActionExecutor,
        recognition: RecognitionEngine,
        decision_engine: HybridDecisionEngine,
        vlm_client: Option<VlmClient>,
    ) -> Self {
        Self {
            safety_gate: SafetyGate::new(config.max_actions_per_min, config.max_clicks),
            failure_limiter: FailureLogLimiter::new(Duration::from_secs(10)),
            config,
            executor,
            recognition,
            decision_engine,
            action_queue: ActionQueue::default(),
            vlm_client,
            state: GameState::new(),
            started_at: None,
            cancelled: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false)),
            summary: SessionSummary::default(),
        }
    }

    /// A cloneable handle callers can flip from another task (e.g. a
    /// ctrl-c handler) to request cancellation at the next tick
    /// boundary.
    pub fn cancellation_handle(&self) -> std::sync::Arc<std::sync::atomic::AtomicBool> {
        self.cancelled.clone()
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn queue(&self) -> &ActionQueue {
        &self.action_queue
    }

    /// Runs ticks until the session times out or is cancelled.
    pub async fn run(&mut self) -> Result<SessionSummary, FatalError> {
        self.started_at = Some(Instant::now());
        loop {
            match self.tick().await? {
                TickOutcome::Continued(_observation) => {
                    tokio::time::sleep(self.config.decision_interval()).await;
                }
                TickOutcome::Stopped(reason) => {
                    log::info!("session loop stopping: {:?}", reason);
                    break;
                }
            }
        }
        Ok(self.summary.clone())
    }

    /// Runs a single tick. Only a `FatalError` (unrecoverable setup
    /// issue) propagates out; every other failure is contained, logged,
    /// and reflected in the returned observation.
    pub async fn tick(&mut self) -> Result<TickOutcome, FatalError> {
        let started_at = self.started_at.get_or_insert_with(Instant::now);
        if started_at.elapsed() > self.config.session_timeout() {
            return Ok(TickOutcome::Stopped(StopReason::SessionTimeout));
        }
        if self.cancelled.load(std::sync::atomic::Ordering::SeqCst) {
            return Ok(TickOutcome::Stopped(StopReason::Cancelled));
        }

        self.summary.ticks += 1;

        let screenshot = match self.executor.screenshot() {
            Ok(shot) => shot,
            Err(e) => {
                self.log_recognition_failure(&format!("capture failed: {}", e));
                self.summary.recognition_failures += 1;
                return Ok(TickOutcome::Continued(self.empty_observation()));
            }
        };

        if let Some(info) = self.executor.window_info() {
            let _ = self.executor.update_resolution(info.width, info.height);
        }

        let shop = self.recognition.recognize_shop(&screenshot);
        let bench = self.recognition.recognize_bench(&screenshot);
        let (gold, level) = self.recognition.recognize_player_info(&screenshot);

        self.state.update_from_recognition(Some(shop.as_slice()), None, Some(bench.as_slice()), None, None);
        if let Some(gold) = gold {
            self.state.gold = gold;
        }
        if let Some(level) = level {
            self.state.level = level;
        }

        let decision = self
            .decision_engine
            .decide(&screenshot, &self.state, &self.config.priority_profile, false, self.vlm_client.as_mut())
            .await;
        self.summary.decisions += 1;

        self.action_queue.enqueue(decision.action.clone());
        let queued_action = decision.action.clone();

        let (executed, safety_block) = self.execute_gate(&queued_action).await;

        let transform = self.recognition.transform();
        let observation = TickObservation {
            window_size: self.executor.window_info().map(|w| (w.width, w.height)).unwrap_or((0, 0)),
            scale: (transform.scale_x(), transform.scale_y()),
            offset: (transform.offset_x(), transform.offset_y()),
            recognized_gold: gold,
            recognized_level: level,
            recognized_shop_count: shop.iter().filter(|s| s.is_some()).count(),
            action_kind: format!("{:?}", decision.action.kind),
            decision_source: decision.source,
            confidence: decision.confidence,
            executed,
            safety_block,
        };
        log::info!(
            "tick {}: window={:?} scale={:?} offset={:?} gold={:?} level={:?} shop={} action={} source={:?} confidence={:.2} executed={}",
            self.summary.ticks,
            observation.window_size,
            observation.scale,
            observation.offset,
            observation.recognized_gold,
            observation.recognized_level,
            observation.recognized_shop_count,
            observation.action_kind,
            observation.decision_source,
            observation.confidence,
            observation.executed,
        );

        Ok(TickOutcome::Continued(observation))
    }

    async fn execute_gate(&mut self, action: &Action) -> (bool, Option<SafetyBlockReason>) {
        if self.config.dry_run {
            self.action_queue.dequeue();
            self.action_queue.complete_current(true, None);
            return (false, None);
        }

        let now = Instant::now();
        if let Some(reason) = self.safety_gate.check(now) {
            log::warn!("safety block: {}", reason);
            self.summary.safety_blocks += 1;
            self.action_queue.dequeue();
            self.action_queue.complete_current(false, Some(reason.to_string()));
            return (false, Some(reason));
        }

        self.action_queue.dequeue();
        let result = self.executor.execute(action).await;
        self.safety_gate.record(now);
        if result.success {
            self.summary.executed += 1;
        } else {
            self.summary.errors += 1;
        }
        self.action_queue.complete_current(result.success, result.error.clone());
        (result.success, None)
    }

    fn log_recognition_failure(&mut self, message: &str) {
        if self.failure_limiter.should_log(Instant::now()) {
            log::warn!("recognition failure (rate-limited logging): {}", message);
        }
    }

    fn empty_observation(&self) -> TickObservation {
        TickObservation {
            window_size: (0, 0),
            scale: (0.0, 0.0),
            offset: (0, 0),
            recognized_gold: None,
            recognized_level: None,
            recognized_shop_count: 0,
            action_kind: "none".to_string(),
            decision_source: DecisionSource::Fallback,
            confidence: 0.0,
            executed: false,
            safety_block: None,
        }
    }
}
