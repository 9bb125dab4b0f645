//! Exporters that move registry snapshots to the outside world.
//!
//! Both exporters only read: they take a snapshot, serialize it with
//! [`wire`](crate::wire), and hand the bytes off. Neither ever mutates
//! registry state.

pub mod pull;
pub mod push;
