//! Game simulation modules

pub mod combat;
pub mod occupancy;
pub mod physics;
pub mod player;
pub mod powerups;
pub mod registry;
pub mod room;
pub mod round;
pub mod scheduler;
pub mod snapshot;

pub use registry::{RoomHandle, RoomRegistry};
pub use room::{Room, RoomError};
pub use round::RoundPhase;
pub use scheduler::TickScheduler;

/// Transient identity of a connected socket
pub type ConnectionId = uuid::Uuid;
