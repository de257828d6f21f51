//! stopmo library crate.
//!
//! This module exposes the internal components for integration testing.

pub mod app;
pub mod camera;
pub mod capture;
pub mod config;
pub mod display;
pub mod export;
pub mod keymap;
pub mod playback;
pub mod session;
pub mod store;
