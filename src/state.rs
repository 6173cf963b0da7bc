//! State and event identities.
//!
//! The engine only cares about a state's id and an event's name; any concrete
//! representation may stand behind the trait. [`DefaultState`] and
//! [`DefaultEvent`] cover the common case of plain string identities.

use std::fmt;

/// A state of the machine. Each state exposes one unique id; the id is what
/// transitions refer to.
pub trait State: Send + Sync {
    fn id(&self) -> &str;
}

/// An event that drives the machine. Events are matched by name, not by
/// object identity.
pub trait Event: Send + Sync {
    fn name(&self) -> &str;
}

/// Default [`State`] implementation backed by a string id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DefaultState {
    id: String,
}

impl DefaultState {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl State for DefaultState {
    fn id(&self) -> &str {
        &self.id
    }
}

impl From<&str> for DefaultState {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for DefaultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Default [`Event`] implementation backed by a name string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DefaultEvent {
    name: String,
}

impl DefaultEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Event for DefaultEvent {
    fn name(&self) -> &str {
        &self.name
    }
}

impl From<&str> for DefaultEvent {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for DefaultEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
