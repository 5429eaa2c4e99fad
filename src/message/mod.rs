//! Canonical message envelope
//!
//! Platform-agnostic message shape exchanged with the message bus, plus the
//! action value envelope that round-trips through interactive buttons.

pub mod envelope;
pub mod types;

pub use envelope::ActionValue;
pub use types::{
    Attachment, AttachmentObject, AttachmentView, Message, MessageType, Receiver, Sender,
    ViewValue,
};
