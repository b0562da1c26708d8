//! `omnigate-core` — shared gateway primitives.
//!
//! This crate contains **pure domain** types (no HTTP or transport concerns).

pub mod id;

pub use id::{CountryId, UserId};
