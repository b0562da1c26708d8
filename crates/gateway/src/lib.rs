//! HTTP edge: routing, the authorization pipeline, and backend handoff.
//!
//! Request flow for proxied routes:
//! correlation → authenticate → authorize → country scope → forward.
//! Each stage may short-circuit into a structured rejection; only a fully
//! admitted request reaches a backend.

pub mod app;
pub mod config;
pub mod context;
pub mod errors;
pub mod middleware;
pub mod proxy;
pub mod routes;
pub mod scope;
