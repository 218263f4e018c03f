//! hotfn-lib: Local hot-reload engine for multi-runtime function projects
//!
//! This crate provides everything `hotfn local` needs to keep a set of functions
//! built and served while their sources change:
//! - `project`: the validated, in-memory project description
//! - `runtime`: the closed set of runtime kinds and their resolution
//! - `build`: serialized build execution with per-function failure isolation
//! - `watch`: filesystem notifications, noise filtering and debouncing
//! - `staging`: the per-function asset mirror under the synthesis output
//! - `gateway`: supervision of the local gateway-emulator process
//! - `engine`: the orchestrator that sequences startup and runs the reactor loop
//! - `platform`: host detection and the fixed target functions are built for

pub mod build;
pub mod consts;
pub mod engine;
pub mod gateway;
pub mod platform;
pub mod project;
pub mod runtime;
pub mod staging;
pub mod util;
pub mod watch;
