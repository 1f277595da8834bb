//! Command handlers.
//!
//! Each handler is a thin `execute` function: read the input, call into
//! `narrator-core` or `narrator-voice`, format the result for the terminal.

pub mod pages;
pub mod schedule;
pub mod segment;
pub mod speak;
