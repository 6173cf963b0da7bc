//! Machine context - the attribute store visible to conditions and actions.

use crate::machine::{MachineInner, StateMachine};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Weak;

/// Mutable attribute store plus a back-reference to the owning machine.
///
/// One context is created per machine and lives for the machine's lifetime.
/// Attributes are only safely read or written while the machine's transition
/// lock is held (from an action or condition callback, or by a caller that
/// serializes through the machine); the context itself does not order
/// concurrent access from unrelated code.
pub struct Context {
    machine: Weak<MachineInner>,
    attributes: RwLock<HashMap<String, Value>>,
}

impl Context {
    pub(crate) fn new(machine: Weak<MachineInner>) -> Self {
        Self {
            machine,
            attributes: RwLock::new(HashMap::new()),
        }
    }

    /// Returns a handle to the owning machine, or `None` if the machine has
    /// been dropped.
    pub fn state_machine(&self) -> Option<StateMachine> {
        self.machine.upgrade().map(StateMachine::from_inner)
    }

    /// Returns the attribute value for `key`, if present.
    pub fn get_attribute(&self, key: &str) -> Option<Value> {
        self.attributes.read().get(key).cloned()
    }

    /// Sets an attribute. An existing value under the same key is replaced.
    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.write().insert(key.into(), value.into());
    }

    /// Returns a snapshot of all attributes.
    pub fn get_attributes(&self) -> HashMap<String, Value> {
        self.attributes.read().clone()
    }

    pub(crate) fn machine_weak(&self) -> Weak<MachineInner> {
        self.machine.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attributes() {
        let sm = StateMachine::new(None, None);
        let ctx = sm.context();

        ctx.set_attribute("x", 1);
        ctx.set_attribute("name", "abc");
        ctx.set_attribute("flag", true);

        assert_eq!(ctx.get_attribute("x"), Some(json!(1)));
        assert_eq!(ctx.get_attribute("name"), Some(json!("abc")));
        assert_eq!(ctx.get_attribute("flag"), Some(json!(true)));
        assert_eq!(ctx.get_attribute("missing"), None);
        assert_eq!(ctx.get_attributes().len(), 3);
    }

    #[test]
    fn test_overwrite_attribute() {
        let sm = StateMachine::new(None, None);
        let ctx = sm.context();

        ctx.set_attribute("x", 1);
        ctx.set_attribute("x", 2);
        assert_eq!(ctx.get_attribute("x"), Some(json!(2)));
        assert_eq!(ctx.get_attributes().len(), 1);
    }

    #[test]
    fn test_machine_back_reference() {
        let sm = StateMachine::new(None, None);
        let machine = sm.context().state_machine().unwrap();
        assert!(!machine.is_running());
    }
}
