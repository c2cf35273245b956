//! Delta-transfer core for an rsync-style file-sync protocol: block
//! signatures, a rolling-checksum matcher, the multiplexed wire framing,
//! and the Generator/Sender/Receiver roles that drive a transfer.
//!
//! File-list enumeration, directory walking, and the remote transport
//! itself are out of scope (spec §1, §6) — this crate picks up once a
//! `FileList` exists and a `Read + Write` link is available for each
//! role to talk over.

pub mod basis;
pub mod blocklen;
pub mod channel;
pub mod checksum;
pub mod error;
pub mod generator;
pub mod interfaces;
pub mod io_utils;
pub mod pipeline;
pub mod receiver;
pub mod sender;
pub mod session;
pub mod signature;
pub mod tempname;
pub mod window;
pub mod wire;

pub use error::{CoreError, CoreResult};
pub use session::{Phase, SessionConfig, SessionStats};
