//! SlackPort - Slack webhook and Web API adapter
//!
//! SlackPort connects Slack workspaces to a platform-agnostic message bus.
//! Inbound webhooks are normalized into canonical messages; canonical
//! messages from the bus are rendered into Block Kit requests.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                        SlackPort Gateway                           │
//! │                                                                    │
//! │  POST /slack/:app/:client[/:action]     GET .../attachment?url=    │
//! │          │                                        │                │
//! │  ┌───────▼─────────┐                     ┌────────▼────────┐       │
//! │  │ Signature check │                     │ Attachment proxy│       │
//! │  └───────┬─────────┘                     │  (bot token,    │       │
//! │  ┌───────▼─────────┐   ┌──────────────┐  │   streamed)     │       │
//! │  │ Identity hook   ├──►│ Auth lookup  │◄─┴─────────────────┘       │
//! │  └───────┬─────────┘   └──────┬───────┘                            │
//! │  ┌───────▼─────────┐          │ scoped tokens                      │
//! │  │ Inbound         │          │                                    │
//! │  │ normalizer      │          │                                    │
//! │  └──┬──────────┬───┘          │                                    │
//! │     │challenge │message       │                                    │
//! │  reply now   ┌─▼──────────┐   │   ┌──────────────┐  ┌───────────┐  │
//! │              │ Message bus│   └──►│ Send hooks   ├─►│ Formatter │  │
//! │              └────────────┘       └──────┬───────┘  └───────────┘  │
//! └──────────────────────────────────────────┼─────────────────────────┘
//!                                            │ chat.postMessage,
//!                                            ▼ conversations.create
//!                                     Slack Web API
//! ```
//!
//! ## Modules
//!
//! - [`slack`]: Slack wire format (sanitizer, Block Kit classifiers,
//!   formatter, inbound normalizer, signature verification)
//! - [`message`]: Canonical message envelope
//! - [`auth`]: Auth lookup and scoped token resolution
//! - [`hooks`]: Named hook handlers
//! - [`client`]: Slack Web API client
//! - [`gateway`]: Webhook server and attachment proxy
//! - [`config`]: Configuration management

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod hooks;
pub mod message;
pub mod slack;

pub use config::SlackPortConfig;
pub use error::{Error, Result};
