//! Shared types for the palette interaction core.
//!
//! Pure data and transforms only: action kinds, control identifier
//! encoding, the interactive control layout model, and the rating
//! vocabulary. No I/O lives here.

pub mod actions;
pub mod controls;
pub mod error;
pub mod types;
