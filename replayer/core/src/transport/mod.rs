//! Transport Layer
//!
//! Owns the single TCP connection the replayer talks over.
//!
//! # Roles
//!
//! ```text
//!   Server role                          Client role
//!   ───────────                          ───────────
//!   bind(host, port)                     connect(host, port)
//!   accept()  (exactly one peer)               │
//!        │                                     │
//!        └──────────────► Connection ◄─────────┘
//!                             │ split()
//!                 ┌───────────┴───────────┐
//!            InboundHalf             OutboundHalf
//!            (Receiver)              (Replayer, PayloadSink)
//! ```
//!
//! The role is fixed when the [`Connection`] is built. The only place it
//! still matters afterwards is the end-of-cycle policy, which is baked into
//! the [`OutboundHalf`] at split time: a server closes its side once a full
//! recording has been replayed, a client keeps streaming.
//!
//! There is no re-accept and no reconnect. Once the connection is gone every
//! further send fails fast.

pub mod endpoint;
pub mod tcp;
pub mod traits;

pub use endpoint::{Endpoint, Role};
pub use tcp::{Connection, InboundHalf, OutboundHalf, ServerEndpoint};
pub use traits::{PayloadSink, PayloadSource};
