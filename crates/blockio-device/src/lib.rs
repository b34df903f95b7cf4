//! # blockio-device: Device Capability Contract
//!
//! This crate defines what every blockio backend must provide and the
//! buffer types that flow through it:
//!
//! - **[`Device`]**: the capability trait (queries, bulk transfer, memory
//!   copy, locked-buffer lifecycle, completion wait)
//! - **[`Buffer`]**: shareable, typed, fixed-length memory regions, either
//!   ordinary or locked for asynchronous transfer
//! - **[`plugin`]**: the ABI a loadable backend module exports
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │         blockio          │
//! │ (Trampoline dispatches)  │
//! └────────────┬─────────────┘
//!              │ Box<dyn Device>
//! ┌────────────┴─────────────┐
//! │      blockio-device      │
//! │  ┌─────────┐  ┌────────┐ │
//! │  │  posix  │  │ module │ │
//! │  │ builtin │  │ _op.so │ │
//! │  └─────────┘  └────────┘ │
//! └──────────────────────────┘
//! ```

mod buffer;
mod device;
mod error;
pub mod plugin;
mod settings;
pub mod validate;

pub use buffer::{Buffer, ElementType, ParseElementTypeError, PinTag};
pub use device::{Device, IoMode};
pub use error::{DeviceError, LifecycleError, TransferError};
pub use settings::DeviceSettings;

#[cfg(test)]
mod tests;
