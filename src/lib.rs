//! Trail Arena Server - authoritative multiplayer trail arena
//!
//! Rooms, the fixed-rate simulation, trail collision, power-ups, round
//! scoring and full/delta state sync, served over WebSockets.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;
