//! The orchestration loop — the heart of Conductor.
//!
//! An [`Agent`] follows a **Request → Dispatch → Observe** cycle:
//!
//! 1. **Receive** a prompt and append it to the conversation
//! 2. **Send** the conversation and every tool schema to the provider
//! 3. **If tool calls**: dispatch them concurrently, append every result
//!    in call order, loop back to step 2
//! 4. **If text**: that is the answer
//!
//! The loop ends on the first text-only response or when the iteration
//! limit runs out, in which case the answer is empty. Every dispatch is
//! traced, and flagged tools can pause at a breakpoint first.

pub mod breakpoint;
pub mod console;
mod dispatch;
pub mod loop_runner;

#[cfg(test)]
mod test_helpers;

pub use breakpoint::{
    BreakpointCommand, BreakpointContext, BreakpointHandler, BreakpointRequest,
    BreakpointSession, ChannelBreakpoints, Resolution, ScriptedBreakpoints,
};
pub use console::{render, spawn_console};
pub use loop_runner::Agent;
