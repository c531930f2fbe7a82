//! # parlor-server
//!
//! The service half of the parlor chat system: everything between an
//! accepted TCP connection and the frames fanned out to the room.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `ws` | Connection registry, message router, per-connection loops |
//! | `server` | TCP accept loop: upgrade vs. static vs. metrics routing |
//! | `static_files` | URL path → file bytes + content type collaborator |
//! | `names` | Fire-and-forget SQLite store of every name that joined |
//! | `metrics` | Prometheus recorder and metric-name constants |
//! | `config` | CLI/env configuration |
//!
//! ## Data Flow
//!
//! `server` accepts → handshake (`parlor-proto`) → `ws::connection` read
//! loop → `ws::router` dispatch → `ws::registry` fan-out.

#![deny(unsafe_code)]

pub mod config;
pub mod metrics;
pub mod names;
pub mod server;
pub mod static_files;
pub mod ws;
