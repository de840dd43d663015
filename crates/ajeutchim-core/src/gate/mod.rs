//! The entry gate: which screen does a launch land on?
//!
//! Two pieces cooperate here:
//! - `SessionResolver` folds the remote identity and the local PIN
//!   presence into a single observable `SessionState`
//! - `PinGate` runs PIN setup, unlock, and reset against the secret store
//!
//! The screens watch `SessionState` and route on it: `NeedsLogin` shows
//! sign-in, `NeedsPinSetup`/`NeedsPinUnlock` hand over to the PIN gate,
//! and `Ready` opens the app proper. Only the gate ever publishes
//! `Ready`.

pub mod pin;
pub mod resolver;

pub use pin::{GateState, PinError, PinGate};
pub use resolver::{SessionHandle, SessionResolver, SessionState};
