//! Powerbox controller core.
//!
//! Rule-driven actuation for a small off-grid power shed: sensors feed a
//! constraint engine, constraints govern devices, and a line-oriented text
//! protocol inspects and reprograms the whole thing at runtime.  The boot
//! script lives in a fixed-layout non-volatile region and is replayed on
//! startup.
//!
//! All hardware access goes through the port traits in [`ports`]; the crate
//! itself is pure logic and runs identically on the host (see the bundled
//! console binary) and on the target.

#![deny(unused_must_use)]

pub mod config;
pub mod context;
pub mod error;
pub mod interp;
pub mod pattern;
pub mod ports;
pub mod registry;
pub mod store;
