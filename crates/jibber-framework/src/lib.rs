//! # Jibber Framework
//!
//! Message dispatch and handler orchestration.
//!
//! This layer provides:
//! - Handler trait and method tables, plus the catalog configuration
//!   instantiates handlers from
//! - Declarative package descriptors (`commands`, `listeners`, `timers`, ...)
//! - Trigger and timer tables, and the commentary anti-loop window
//! - The [`Dispatcher`], which routes inbound events, sends replies and keeps
//!   timers armed
//! - An in-memory [`testing::RecordingTransport`]

pub mod commentary;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod normalizer;
pub mod registry;
pub mod state;
pub mod testing;
pub mod timer;
pub mod trigger;

pub use commentary::CommentaryWindow;
pub use descriptor::{ClientConfig, HandlerDescriptor, ScheduleEntry, TimerGroup};
pub use dispatcher::{Dispatcher, DispatcherBuilder, Invocation};
pub use error::{SetupError, SetupResult};
pub use handler::{
    BoxedHandler, CallingConvention, ErasedHandler, Handler, HandlerResult, Method, Methods,
    into_handler,
};
pub use normalizer::normalize;
pub use registry::{HandlerCatalog, HandlerFactory, HandlerRegistry};
pub use state::DispatcherState;
pub use timer::{DelaySpec, TimerEntry, TimerKey, TimerTable};
pub use trigger::{MethodRef, NICKNAME_PLACEHOLDER, Trigger, TriggerEntry, TriggerTable};
