//! # Jibber Core
//!
//! Foundation types for the jibber MUC chat-bot framework.
//!
//! - **Messages**: what the transport delivers ([`Message`], [`InboundEvent`])
//!   and what a trigger captured ([`Match`])
//! - **Replies**: what handlers return ([`Reply`], [`ReplyFields`]) and what
//!   is finally sent ([`OutboundMessage`])
//! - **Markup**: detection, tag stripping and well-formedness checks
//! - **Transport**: the collaborator that sends messages and runs timers
//!
//! ```text
//! ┌───────────┐ InboundEvent ┌────────────┐  Reply  ┌──────────┐
//! │ Transport │─────────────▶│ Dispatcher │◀────────│ Handlers │
//! │           │◀─────────────│            │────────▶│          │
//! └───────────┘  Outbound    └────────────┘ Message └──────────┘
//! ```

pub mod error;
pub mod markup;
pub mod message;
pub mod reply;
pub mod transport;

pub use error::{MarkupError, TransportError, TransportResult};
pub use markup::{MarkupSummary, looks_like_markup, strip_tags};
pub use message::{InboundEvent, Match, Message, MessageKind};
pub use reply::{OutboundMessage, Reply, ReplyFields, SendDefaults};
pub use transport::{ScheduledTask, Transport};
