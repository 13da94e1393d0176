//! Traffic Manager Library
//!
//! Injects vehicles into a running traffic simulation at randomized times,
//! with routes and lane placement taken from the simulator's road network.

pub mod injection;
