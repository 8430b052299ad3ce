//! Data Transfer Objects (DTOs) for persistence.
//!
//! These DTOs represent the versioned schema of the durable store record.
//! They are private to the infrastructure layer and handle the evolution
//! of the storage format over time.
//!
//! ### StackState Version History
//! - **1.0.0**: Saved stacks and the current stack id
//! - **1.1.0**: Added the working set (`items`)

mod stack_state;

pub use stack_state::{
    STACK_STATE_VERSIONS, SavedStackDTO, StackItemDTO, StackStateDTO, StackStateV1_0_0,
    StackStateV1_1_0, create_stack_state_migrator,
};
