//! Demo state: a counter driven by four command kinds.

use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_types::Command;

pub const INCREMENT: &str = "counter/increment";
pub const DECREMENT: &str = "counter/decrement";
pub const ADD: &str = "counter/add";
pub const RESET: &str = "counter/reset";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterState {
    pub count: i64,
}

impl CounterState {
    #[must_use]
    pub fn new(count: i64) -> Self {
        Self { count }
    }
}

/// Reducer. Unknown kinds and `counter/add` without an integer payload
/// leave the state unchanged.
pub fn reduce(state: &CounterState, command: &Command) -> CounterState {
    match command.kind.as_str() {
        INCREMENT => CounterState::new(state.count + 1),
        DECREMENT => CounterState::new(state.count - 1),
        ADD => match command.payload.as_i64() {
            Some(amount) => CounterState::new(state.count + amount),
            None => *state,
        },
        RESET => CounterState::default(),
        _ => *state,
    }
}

#[must_use]
pub fn increment() -> Command {
    Command::new(INCREMENT)
}

#[must_use]
pub fn decrement() -> Command {
    Command::new(DECREMENT)
}

#[must_use]
pub fn add(amount: i64) -> Command {
    Command::new(ADD).with_payload(json!(amount))
}

#[must_use]
pub fn reset() -> Command {
    Command::new(RESET)
}
