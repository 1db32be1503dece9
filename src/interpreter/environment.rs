use crate::interpreter::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;

/// The single name-to-value store for a whole run. Blocks do not push a new
/// scope, so every binding lives here until the process exits.
#[derive(Debug, Default)]
pub struct Environment {
    values: RefCell<HashMap<String, Value>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name`, replacing any earlier binding of the same name.
    pub fn define(&self, name: &str, value: Value) {
        self.values.borrow_mut().insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Result<Value, String> {
        self.values
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| format!("Undefined variable '{}'.", name))
    }

    /// Rebinds an existing name. Assignment never creates a variable.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), String> {
        match self.values.borrow_mut().get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(format!("Undefined variable '{}'.", name)),
        }
    }
}
