//! # fsm-runtime
//!
//! An embeddable, generic finite state machine engine. An application
//! defines states, events, guarded transitions, and entry/exit actions,
//! then drives the machine by feeding it events.
//!
//! This crate provides:
//! - The transition engine with deterministic, insertion-ordered transition
//!   selection and a concurrency-safe event loop
//! - A per-state timeout subsystem (arm on entry, cancel on transition,
//!   fire as a regular event)
//! - Injectable policy interfaces for condition evaluation and action
//!   dispatch, with default implementations
//! - Declarative machine configuration from JSON or YAML
//!
//! ```
//! use fsm_runtime::{DefaultEvent, DefaultState, StateMachine, Transition};
//! use std::sync::Arc;
//!
//! let sm = StateMachine::new(None, None);
//! sm.add_state(Arc::new(DefaultState::new("idle")))
//!     .add_state(Arc::new(DefaultState::new("busy")))
//!     .set_initial_state_id("idle");
//! sm.add_transition(Transition::new("idle", "work", "busy")).unwrap();
//!
//! sm.start().unwrap();
//! sm.send_event(Arc::new(DefaultEvent::new("work"))).unwrap();
//! assert_eq!(sm.current_state().unwrap().id(), "busy");
//! ```

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod evaluator;
pub mod machine;
pub mod state;
mod timer;
mod value;

pub use config::{ActionConfig, Configurer, MachineConfig, StateConfig, TransitionConfig};
pub use context::Context;
pub use dispatcher::{ActionDispatcher, DefaultActionDispatcher, Executor, ParamType};
pub use error::FsmError;
pub use evaluator::{ConditionEvaluator, DefaultConditionEvaluator};
pub use machine::{Action, RunStatus, StateMachine, Transition};
pub use state::{DefaultEvent, DefaultState, Event, State};
