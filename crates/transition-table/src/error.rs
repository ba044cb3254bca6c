use thiserror::Error;

use crate::ops::MAX_STAGES;

pub type Result<T> = std::result::Result<T, TransitionTableError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionTableError {
    #[error("device reports {count} texture stages; at most {max} are supported", max = MAX_STAGES)]
    TooManyStages { count: usize },

    #[error("device reports {count} samplers; at most {max} are supported", max = MAX_STAGES)]
    TooManySamplers { count: usize },

    #[error(
        "state has {stages} texture stages and {samplers} samplers, device has {expected_stages} and {expected_samplers}"
    )]
    StateShape {
        stages: usize,
        samplers: usize,
        expected_stages: usize,
        expected_samplers: usize,
    },

    #[error("transition op table overflow: op range starting at {first} with {count} ops does not fit")]
    OpTableOverflow { first: usize, count: usize },
}
