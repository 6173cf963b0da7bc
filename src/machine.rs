//! State machine engine - tables, cursor, event processing, and timeouts.

use crate::config::Configurer;
use crate::context::Context;
use crate::dispatcher::ActionDispatcher;
use crate::error::FsmError;
use crate::evaluator::ConditionEvaluator;
use crate::state::{Event, State};
use crate::timer::{self, TimerHandle};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Run status of a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    /// Before `start` or after `stop`; events are dropped.
    #[default]
    Stopped,
    /// Between `start` and `stop`; events are processed.
    Running,
}

/// A transition rule: from a source state, on a named event, optionally
/// guarded by a condition, move to a target state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub source_id: String,
    pub target_id: String,
    pub event_name: String,
    /// Condition in the evaluator's expression form. `None` (or empty)
    /// means unconditional.
    pub condition: Option<String>,
}

impl Transition {
    pub fn new(
        source_id: impl Into<String>,
        event_name: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            event_name: event_name.into(),
            condition: None,
        }
    }

    /// Guards the transition with a condition.
    pub fn when(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    fn condition_str(&self) -> Option<&str> {
        self.condition.as_deref().filter(|c| !c.is_empty())
    }
}

/// A named, parameterized operation invoked on state entry or exit.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub name: String,
    pub parameters: Vec<Value>,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    /// Appends a parameter.
    pub fn param(mut self, value: impl Into<Value>) -> Self {
        self.parameters.push(value.into());
        self
    }
}

/// Configuration tables. Populated before `start`, read during operation.
#[derive(Default)]
struct Tables {
    states: HashMap<String, Arc<dyn State>>,
    /// Transitions per source state id. Insertion order is the tie-break
    /// when several transitions match an event.
    transitions: HashMap<String, Vec<Transition>>,
    entry_actions: HashMap<String, Vec<Action>>,
    exit_actions: HashMap<String, Vec<Action>>,
    /// Timeout seconds per state id; only positive timeouts are stored.
    timeouts: HashMap<String, u64>,
    initial_state_id: String,
    timeout_event: Option<Arc<dyn Event>>,
    default_timeout_state_id: String,
}

/// Mutable runtime state. Written only under the transition lock.
#[derive(Default)]
struct Cursor {
    run_status: RunStatus,
    current: Option<Arc<dyn State>>,
    previous: Option<Arc<dyn State>>,
    /// Non-nil only mid-transition, between selecting a target and moving
    /// the cursor.
    next: Option<Arc<dyn State>>,
    last_event: Option<Arc<dyn Event>>,
    timer: Option<TimerHandle>,
    /// Bumped on every transition; a timer armed under an older epoch is
    /// stale and must not fire.
    timer_epoch: u64,
}

pub(crate) struct MachineInner {
    tables: RwLock<Tables>,
    cursor: RwLock<Cursor>,
    /// The single serialization point. `start`, `stop`, `send_event`, and
    /// the timeout callback hold it for their entire duration, including
    /// action dispatch and condition evaluation.
    transit_lock: Mutex<()>,
    context: Context,
    evaluator: Option<Arc<dyn ConditionEvaluator>>,
    dispatcher: Option<Arc<dyn ActionDispatcher>>,
}

/// The state machine engine.
///
/// A machine owns its state/transition/action/timeout tables, the current
/// state cursor, and the per-state timeout timer, and calls out to the
/// injected [`ConditionEvaluator`] and [`ActionDispatcher`].
///
/// Handles are cheap to clone and share one machine. All state-mutating
/// entry points serialize through a single per-machine lock; action and
/// condition callbacks run with that lock held and must not call
/// [`send_event`](StateMachine::send_event) on the same machine
/// synchronously (the timeout timer re-enters from its own thread, which is
/// the sanctioned path).
#[derive(Clone)]
pub struct StateMachine {
    inner: Arc<MachineInner>,
}

impl std::fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine").finish_non_exhaustive()
    }
}

impl StateMachine {
    /// Creates a machine with the given policy objects. Either may be
    /// absent when conditions or actions are not used.
    pub fn new(
        evaluator: Option<Arc<dyn ConditionEvaluator>>,
        dispatcher: Option<Arc<dyn ActionDispatcher>>,
    ) -> Self {
        let inner = Arc::new_cyclic(|weak| MachineInner {
            tables: RwLock::new(Tables::default()),
            cursor: RwLock::new(Cursor::default()),
            transit_lock: Mutex::new(()),
            context: Context::new(weak.clone()),
            evaluator,
            dispatcher,
        });

        Self { inner }
    }

    pub(crate) fn from_inner(inner: Arc<MachineInner>) -> Self {
        Self { inner }
    }

    /// Returns the machine's context.
    pub fn context(&self) -> &Context {
        &self.inner.context
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Adds one state. A state with the same id is replaced.
    pub fn add_state(&self, state: Arc<dyn State>) -> &Self {
        self.inner
            .tables
            .write()
            .states
            .insert(state.id().to_string(), state);
        self
    }

    /// Adds several states.
    pub fn add_states(&self, states: impl IntoIterator<Item = Arc<dyn State>>) -> &Self {
        let mut tables = self.inner.tables.write();
        for state in states {
            tables.states.insert(state.id().to_string(), state);
        }
        drop(tables);
        self
    }

    /// Returns the state registered under `id`.
    pub fn state(&self, id: &str) -> Option<Arc<dyn State>> {
        self.inner.tables.read().states.get(id).cloned()
    }

    /// Returns all registered states.
    pub fn states(&self) -> Vec<Arc<dyn State>> {
        self.inner.tables.read().states.values().cloned().collect()
    }

    /// Adds one transition. A conditional transition requires the machine
    /// to have a condition evaluator.
    pub fn add_transition(&self, transition: Transition) -> Result<&Self, FsmError> {
        if transition.condition_str().is_some() && self.inner.evaluator.is_none() {
            return Err(FsmError::MissingEvaluator);
        }

        self.inner
            .tables
            .write()
            .transitions
            .entry(transition.source_id.clone())
            .or_default()
            .push(transition);

        Ok(self)
    }

    /// Adds an entry action to a state. Requires an action dispatcher.
    pub fn add_on_entry(&self, state_id: &str, action: Action) -> Result<&Self, FsmError> {
        if self.inner.dispatcher.is_none() {
            return Err(FsmError::MissingDispatcher);
        }

        self.inner
            .tables
            .write()
            .entry_actions
            .entry(state_id.to_string())
            .or_default()
            .push(action);

        Ok(self)
    }

    /// Adds an exit action to a state. Requires an action dispatcher.
    pub fn add_on_exit(&self, state_id: &str, action: Action) -> Result<&Self, FsmError> {
        if self.inner.dispatcher.is_none() {
            return Err(FsmError::MissingDispatcher);
        }

        self.inner
            .tables
            .write()
            .exit_actions
            .entry(state_id.to_string())
            .or_default()
            .push(action);

        Ok(self)
    }

    /// Sets a state's timeout. Requires the timeout event to be set first.
    /// A zero timeout is ignored.
    pub fn add_timeout(&self, state_id: &str, seconds: u64) -> Result<&Self, FsmError> {
        let mut tables = self.inner.tables.write();
        if tables.timeout_event.is_none() {
            return Err(FsmError::MissingTimeoutEvent);
        }

        if seconds > 0 {
            tables.timeouts.insert(state_id.to_string(), seconds);
        }

        Ok(self)
    }

    /// Sets the initial state id entered by `start`.
    pub fn set_initial_state_id(&self, state_id: impl Into<String>) -> &Self {
        self.inner.tables.write().initial_state_id = state_id.into();
        self
    }

    /// Sets the machine-wide event sent when a state's timer expires.
    pub fn set_timeout_event(&self, event: Arc<dyn Event>) -> &Self {
        self.inner.tables.write().timeout_event = Some(event);
        self
    }

    /// Sets the fallback target for a timeout event with no matching
    /// transition.
    pub fn set_default_timeout_state_id(&self, state_id: impl Into<String>) -> &Self {
        self.inner.tables.write().default_timeout_state_id = state_id.into();
        self
    }

    /// Populates the machine's tables from a configurer.
    pub fn load_config(&self, configurer: &dyn Configurer) -> Result<&Self, FsmError> {
        configurer.configure(self)?;
        Ok(self)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Starts the machine: enters the initial state, firing its entry
    /// actions and arming its timeout, and begins accepting events.
    pub fn start(&self) -> Result<(), FsmError> {
        let inner = &self.inner;
        let _guard = inner.transit_lock.lock();

        let initial = {
            let tables = inner.tables.read();
            tables
                .states
                .get(&tables.initial_state_id)
                .cloned()
                .ok_or_else(|| FsmError::UnknownState {
                    state_id: tables.initial_state_id.clone(),
                })?
        };

        inner.transit(None, Some(initial))?;
        inner.cursor.write().run_status = RunStatus::Running;

        tracing::debug!("state machine started");
        Ok(())
    }

    /// Stops the machine: exits the current state, firing its exit actions,
    /// and stops accepting events. The machine may be started again.
    pub fn stop(&self) -> Result<(), FsmError> {
        let inner = &self.inner;
        let _guard = inner.transit_lock.lock();

        inner.transit(None, None)?;
        inner.cursor.write().run_status = RunStatus::Stopped;

        tracing::debug!("state machine stopped");
        Ok(())
    }

    /// Sends an event to the machine, possibly triggering a transition.
    ///
    /// Dropped silently when the machine is not running. When several
    /// transitions from the current state match the event, the first
    /// satisfied one in registration order wins. A matching timeout event
    /// with no explicit transition falls back to the default timeout state.
    pub fn send_event(&self, event: Arc<dyn Event>) -> Result<(), FsmError> {
        let inner = &self.inner;
        let _guard = inner.transit_lock.lock();

        if inner.cursor.read().run_status != RunStatus::Running {
            return Ok(());
        }

        if let Some(target) = inner.select_target(event.name())? {
            inner.transit(Some(event), Some(target))?;
        }

        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the current state; `None` while stopped.
    pub fn current_state(&self) -> Option<Arc<dyn State>> {
        self.inner.cursor.read().current.clone()
    }

    /// Returns the state before the last transition.
    pub fn previous_state(&self) -> Option<Arc<dyn State>> {
        self.inner.cursor.read().previous.clone()
    }

    /// Returns the transition target; non-nil only mid-transition.
    pub fn next_state(&self) -> Option<Arc<dyn State>> {
        self.inner.cursor.read().next.clone()
    }

    /// Returns the event that triggered the last transition, if any.
    pub fn last_event(&self) -> Option<Arc<dyn Event>> {
        self.inner.cursor.read().last_event.clone()
    }

    /// Returns a state's configured timeout in seconds.
    pub fn timeout(&self, state_id: &str) -> Option<u64> {
        self.inner.tables.read().timeouts.get(state_id).copied()
    }

    pub fn is_running(&self) -> bool {
        self.inner.cursor.read().run_status == RunStatus::Running
    }
}

impl MachineInner {
    /// Resolves the target state for an event against the current state.
    /// Caller holds the transition lock.
    fn select_target(&self, event_name: &str) -> Result<Option<Arc<dyn State>>, FsmError> {
        let current = match self.cursor.read().current.clone() {
            Some(state) => state,
            None => return Ok(None),
        };

        let transitions = self
            .tables
            .read()
            .transitions
            .get(current.id())
            .cloned()
            .unwrap_or_default();

        for transition in &transitions {
            if transition.event_name != event_name {
                continue;
            }

            if let Some(condition) = transition.condition_str() {
                let evaluator = self.evaluator.as_ref().ok_or(FsmError::MissingEvaluator)?;
                if !evaluator.is_satisfied(condition, &self.context)? {
                    continue;
                }
            }

            // first satisfied transition in registration order wins
            return Ok(self.tables.read().states.get(&transition.target_id).cloned());
        }

        // timeout event with no explicit transition falls back to the
        // default timeout state
        let tables = self.tables.read();
        if let Some(timeout_event) = &tables.timeout_event {
            if timeout_event.name() == event_name && !tables.default_timeout_state_id.is_empty() {
                return Ok(tables
                    .states
                    .get(&tables.default_timeout_state_id)
                    .cloned());
            }
        }

        Ok(None)
    }

    /// Moves the machine to a new state: cancels the outstanding timer,
    /// runs the old state's exit actions, moves the cursor, runs the new
    /// state's entry actions, then arms the new state's timeout. Caller
    /// holds the transition lock.
    ///
    /// A failing action unwinds immediately; effects already applied are
    /// not rolled back and the cursor may be left mid-transition.
    fn transit(
        &self,
        event: Option<Arc<dyn Event>>,
        target: Option<Arc<dyn State>>,
    ) -> Result<(), FsmError> {
        self.cancel_timer();

        {
            let mut cursor = self.cursor.write();
            cursor.last_event = event;
            cursor.next = target;
        }

        let exiting = self.cursor.read().current.clone();
        if let Some(state) = exiting {
            let actions = self
                .tables
                .read()
                .exit_actions
                .get(state.id())
                .cloned()
                .unwrap_or_default();
            for action in &actions {
                self.dispatch_action(action)?;
            }
        }

        {
            let mut cursor = self.cursor.write();
            cursor.previous = cursor.current.take();
            cursor.current = cursor.next.take();
            tracing::debug!(
                "state changed: {} -> {}",
                state_id_or_none(&cursor.previous),
                state_id_or_none(&cursor.current),
            );
        }

        let entered = self.cursor.read().current.clone();
        if let Some(state) = entered {
            let (actions, timeout) = {
                let tables = self.tables.read();
                (
                    tables
                        .entry_actions
                        .get(state.id())
                        .cloned()
                        .unwrap_or_default(),
                    tables.timeouts.get(state.id()).copied(),
                )
            };

            for action in &actions {
                self.dispatch_action(action)?;
            }

            // the timer starts counting only after all entry actions ran
            if let Some(seconds) = timeout {
                self.arm_timer(seconds);
            }
        }

        Ok(())
    }

    fn dispatch_action(&self, action: &Action) -> Result<(), FsmError> {
        let dispatcher = self.dispatcher.as_ref().ok_or(FsmError::MissingDispatcher)?;
        dispatcher.dispatch(action, &self.context)
    }

    /// Arms the timeout timer for the just-entered state. Caller holds the
    /// transition lock.
    fn arm_timer(&self, seconds: u64) {
        let event = match self.tables.read().timeout_event.clone() {
            Some(event) => event,
            None => return,
        };

        let epoch = self.cursor.read().timer_epoch;
        let machine = self.context.machine_weak();

        let handle = timer::schedule(Duration::from_secs(seconds), move || {
            if let Some(inner) = machine.upgrade() {
                if let Err(e) = inner.fire_timeout(epoch, event) {
                    tracing::warn!("timeout transition failed: {}", e);
                }
            }
        });

        self.cursor.write().timer = Some(handle);
        tracing::debug!("timeout armed for {}s", seconds);
    }

    /// Cancels the outstanding timer, if any, and invalidates its epoch so
    /// a concurrently firing timer cannot transition the machine. Caller
    /// holds the transition lock.
    fn cancel_timer(&self) {
        let handle = {
            let mut cursor = self.cursor.write();
            cursor.timer_epoch = cursor.timer_epoch.wrapping_add(1);
            cursor.timer.take()
        };

        if let Some(handle) = handle {
            handle.cancel();
        }
    }

    /// Timer callback: re-enters through the transition lock like any other
    /// caller and sends the timeout event, unless the arming epoch went
    /// stale in the meantime.
    fn fire_timeout(&self, epoch: u64, event: Arc<dyn Event>) -> Result<(), FsmError> {
        let _guard = self.transit_lock.lock();

        {
            let cursor = self.cursor.read();
            if cursor.timer_epoch != epoch || cursor.run_status != RunStatus::Running {
                return Ok(());
            }
        }

        tracing::debug!("timeout fired: {}", event.name());
        if let Some(target) = self.select_target(event.name())? {
            self.transit(Some(event), Some(target))?;
        }

        Ok(())
    }
}

fn state_id_or_none(state: &Option<Arc<dyn State>>) -> &str {
    state.as_ref().map(|s| s.id()).unwrap_or("<none>")
}
