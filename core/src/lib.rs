//! Concurrent state core for the Memory Scramble card-matching game
//!
//! Any number of players share one grid of face-down cards and drive it
//! through a three-phase turn protocol: flip a first card, flip a second
//! card, then on the next flip either remove a matched pair or turn the
//! missed pair face down again. This crate provides the fundamental pieces:
//! - `Board`: the shared grid plus per-player turn state, with per-cell
//!   FIFO wait queues and change notification for watchers
//! - `FlipError` / `ParseError`: the failures surfaced to the transport
//! - a per-player text renderer and a board-file parser
//!
//! The board is cheap to share behind an `Arc`; every operation takes
//! `&self` and owns its own locking.

pub mod board;
pub mod error;
pub mod spot;

mod parse;
mod render;

// Re-export main types for convenience
pub use board::Board;
pub use error::{FlipError, ParseError};
pub use spot::{Coord, Spot, Turn};
