//! Machine configuration loading.
//!
//! A machine can be populated from a declarative description instead of
//! calling the configuration methods by hand. The description uses one
//! schema with two serializations, JSON and YAML:
//!
//! ```yaml
//! initial_state_id: s1
//! default_timeout_state_id: s3
//! states:
//!   - id: s1
//!     timeout_seconds: 60
//!     on_entry:
//!       - name: logger.record
//!         parameters: [entered, 1]
//!     transitions:
//!       - {event: e1, condition: "x=1", target: s2}
//!       - {event: e1, target: s3}
//!   - id: s2
//!     on_exit:
//!       - name: logger.record
//!         parameters: [left, 2]
//! ```
//!
//! Declared order of actions and transitions is preserved; it decides which
//! transition wins when several match an event.

use crate::error::FsmError;
use crate::machine::{Action, StateMachine, Transition};
use crate::state::DefaultState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Populates a machine's tables from a data source.
pub trait Configurer {
    fn configure(&self, machine: &StateMachine) -> Result<(), FsmError>;
}

/// Declarative machine description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineConfig {
    #[serde(default)]
    pub initial_state_id: String,

    /// When set, states named in the description but not registered on the
    /// machine are created as [`DefaultState`]s. Defaults to true.
    #[serde(default = "default_state_mode")]
    pub use_default_state_mode: bool,

    #[serde(default)]
    pub default_timeout_state_id: String,

    #[serde(default)]
    pub states: Vec<StateConfig>,
}

/// One state's description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    pub id: String,

    #[serde(default)]
    pub timeout_seconds: u64,

    #[serde(default)]
    pub on_entry: Vec<ActionConfig>,

    #[serde(default)]
    pub on_exit: Vec<ActionConfig>,

    #[serde(default)]
    pub transitions: Vec<TransitionConfig>,
}

/// An action reference with its literal parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionConfig {
    pub name: String,

    #[serde(default)]
    pub parameters: Vec<Value>,
}

impl ActionConfig {
    fn to_action(&self) -> Action {
        Action {
            name: self.name.clone(),
            parameters: self.parameters.clone(),
        }
    }
}

/// A transition rule as declared under its source state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionConfig {
    pub event: String,

    #[serde(default)]
    pub condition: Option<String>,

    pub target: String,
}

impl TransitionConfig {
    fn to_transition(&self, source_id: &str) -> Transition {
        Transition {
            source_id: source_id.to_string(),
            target_id: self.target.clone(),
            event_name: self.event.clone(),
            condition: self.condition.clone(),
        }
    }
}

fn default_state_mode() -> bool {
    true
}

impl MachineConfig {
    /// Parses a configuration from its JSON form.
    pub fn from_json(input: &str) -> Result<Self, FsmError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Parses a configuration from its YAML form.
    pub fn from_yaml(input: &str) -> Result<Self, FsmError> {
        Ok(serde_yaml::from_str(input)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, FsmError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, FsmError> {
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }
}

impl Configurer for MachineConfig {
    fn configure(&self, machine: &StateMachine) -> Result<(), FsmError> {
        for state in &self.states {
            if machine.state(&state.id).is_none() {
                if self.use_default_state_mode {
                    machine.add_state(Arc::new(DefaultState::new(state.id.as_str())));
                } else {
                    return Err(FsmError::UnknownState {
                        state_id: state.id.clone(),
                    });
                }
            }

            if state.timeout_seconds > 0 {
                machine.add_timeout(&state.id, state.timeout_seconds)?;
            }

            for action in &state.on_entry {
                machine.add_on_entry(&state.id, action.to_action())?;
            }

            for action in &state.on_exit {
                machine.add_on_exit(&state.id, action.to_action())?;
            }

            for transition in &state.transitions {
                machine.add_transition(transition.to_transition(&state.id))?;
            }
        }

        // initial and default-timeout state ids must resolve once every
        // state has been added
        if !self.initial_state_id.is_empty() && machine.state(&self.initial_state_id).is_none() {
            return Err(FsmError::UnknownState {
                state_id: self.initial_state_id.clone(),
            });
        }
        if !self.default_timeout_state_id.is_empty()
            && machine.state(&self.default_timeout_state_id).is_none()
        {
            return Err(FsmError::UnknownState {
                state_id: self.default_timeout_state_id.clone(),
            });
        }

        machine.set_initial_state_id(self.initial_state_id.as_str());
        machine.set_default_timeout_state_id(self.default_timeout_state_id.as_str());

        tracing::debug!("configured {} states", self.states.len());
        Ok(())
    }
}
