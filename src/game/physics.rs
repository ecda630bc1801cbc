//! Head movement and world topology

use std::f32::consts::TAU;

use crate::config::GameConfig;

/// Movement constants pulled out of the game config
#[derive(Debug, Clone, Copy)]
pub struct MovementStats {
    /// Radians per tick at full turn
    pub turn_rate: f32,
    /// World units per tick
    pub speed: f32,
    pub world_width: f32,
    pub world_height: f32,
}

impl MovementStats {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            turn_rate: config.turn_rate,
            speed: config.movement_speed,
            world_width: config.world_width,
            world_height: config.world_height,
        }
    }
}

/// Physics system for advancing heads across the toroidal world
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Advance a head by one tick.
    /// Returns (new_x, new_y, new_heading)
    pub fn step_head(
        x: f32,
        y: f32,
        heading: f32,
        turning: f32,
        stats: &MovementStats,
    ) -> (f32, f32, f32) {
        let turning = turning.clamp(-1.0, 1.0);

        let new_heading = (heading + turning * stats.turn_rate).rem_euclid(TAU);

        let new_x = x + new_heading.cos() * stats.speed;
        let new_y = y + new_heading.sin() * stats.speed;

        let (new_x, new_y) = Self::wrap(new_x, new_y, stats.world_width, stats.world_height);
        (new_x, new_y, new_heading)
    }

    /// Wrap a point onto the torus `[0, width) x [0, height)`
    pub fn wrap(x: f32, y: f32, width: f32, height: f32) -> (f32, f32) {
        (wrap_axis(x, width), wrap_axis(y, height))
    }

    /// Whether a point lies inside the world without wrapping
    pub fn in_world(x: f32, y: f32, width: f32, height: f32) -> bool {
        x >= 0.0 && x < width && y >= 0.0 && y < height
    }

    /// Smallest absolute difference between two angles, in `[0, π]`
    pub fn angle_between(a: f32, b: f32) -> f32 {
        let diff = (a - b).rem_euclid(TAU);
        diff.min(TAU - diff)
    }

    pub fn distance_sq(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
        let dx = x2 - x1;
        let dy = y2 - y1;
        dx * dx + dy * dy
    }
}

fn wrap_axis(value: f32, extent: f32) -> f32 {
    let wrapped = value.rem_euclid(extent);
    // rem_euclid can round up to exactly `extent` for tiny negative inputs
    if wrapped >= extent {
        0.0
    } else {
        wrapped
    }
}
