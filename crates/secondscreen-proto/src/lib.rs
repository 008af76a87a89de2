//! SecondScreen wire protocol
//!
//! Types shared between the presentation manager and whatever carries its
//! method channel (the stdio daemon, embedding hosts, tests).
//!
//! This crate contains:
//! - method, notification and error-code names
//! - `DisplayDescriptor` and the frame envelopes written on the channel
//! - typed per-method requests normalized from loosely shaped arguments

pub mod methods;
pub mod requests;
pub mod types;

pub use requests::{
    ArgumentError, HideRequest, ListDisplayRequest, PrewarmRequest, ShowRequest, TransferRequest,
};
pub use types::{
    DisplayDescriptor, DisplayEventFrame, MethodCall, MethodError, MethodResponse,
    NotificationFrame, PowerState,
};
