//! # parlor-core
//!
//! Foundation types for the parlor chat service.
//!
//! This crate provides the shared vocabulary the protocol and server crates
//! depend on:
//!
//! - **Branded IDs**: [`ids::ConnId`] as a newtype minted from an atomic counter
//! - **Wire messages**: [`messages::ClientMessage`] and [`messages::ServerMessage`],
//!   the JSON bodies carried inside text frames
//! - **Text utilities**: [`text::normalize_name`] for display-name validation
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by `parlor-server`.

#![deny(unsafe_code)]

pub mod ids;
pub mod messages;
pub mod text;
