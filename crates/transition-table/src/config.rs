/// Env var that enables the device validation probe for newly created states.
pub const VALIDATE_NEW_STATES_ENV: &str = "TRANSITION_TABLE_VALIDATE";

/// Env var that enables per-transition `trace!` output.
pub const TRACE_TRANSITIONS_ENV: &str = "TRANSITION_TABLE_TRACE";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TableConfig {
    /// Probe the device with every newly created state in
    /// [`crate::TransitionTable::take_validated_snapshot`].
    pub validate_new_states: bool,
    /// Log every applied transition and the ops it executes.
    pub trace_transitions: bool,
}

impl TableConfig {
    pub fn from_env() -> Self {
        Self {
            validate_new_states: env_var_truthy(VALIDATE_NEW_STATES_ENV),
            trace_transitions: env_var_truthy(TRACE_TRANSITIONS_ENV),
        }
    }
}

fn env_var_truthy(name: &str) -> bool {
    let Ok(raw) = std::env::var(name) else {
        return false;
    };

    let v = raw.trim();
    v == "1"
        || v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
}
