//! # Voice Call Client
//!
//! Session engine for a two-party audio call over UDP.
//!
//! ## Architecture Overview
//!
//! ```text
//!  any thread                     session context (tokio task)
//! ┌───────────────┐   commands   ┌──────────────────────────────────┐
//! │ SessionHandle ├─────────────►│ SessionActor                     │
//! └───────────────┘   (FIFO)     │   ├─ VoiceEngine (channel)       │
//!                                │   │    ├─ capture → opus/G.711   │
//! ┌───────────────┐  completions │   │    └─ jitter  → playout      │
//! │SessionObserver│◄─────────────┤   └─ TransportPair               │
//! └───────────────┘   (weak)     │        ├─ RTP socket  (port N)   │
//!                                │        └─ RTCP socket (port N+1) │
//!                                └──────────────────────────────────┘
//! ```
//!
//! All session state lives inside the actor; callers interact through
//! fire-and-forget commands and get outcomes back on the observer.

pub mod audio;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod net;
pub mod rtp;
pub mod session;

pub use error::{Error, Result};
