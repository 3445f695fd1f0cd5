mod context;
mod error;
mod plan;

pub use context::Context;
pub use error::{EngineError, Result};
pub use plan::{
    ActionKind, ActionNode, CatchBlock, DelayPayload, FinallyBlock, HttpPayload, InvokePayload,
    LogPayload, Plan, SetPayload, SwitchPayload, TryPayload,
};
