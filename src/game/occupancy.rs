//! Trail occupancy grid and look-ahead collision checks
//!
//! Every living, non-ghost head stamps a small disc into a per-room bitmap each
//! tick. A head is "about to hit" when any of a short fan of points in front of
//! it lands on a stamped cell or off the edge of the world. Checks touch only a
//! handful of cells, never the whole grid.

use rand::Rng;

use crate::config::GameConfig;

use super::physics::PhysicsSystem;
use super::player::PlayerState;

/// Look-ahead parameters pulled out of the game config
#[derive(Debug, Clone)]
pub struct LookAhead {
    pub distance: f32,
    /// Offsets from the heading, checked in this order
    pub angles: Vec<f32>,
    pub self_exclusion_radius: f32,
    pub lethal_boundary: bool,
    pub skip_probability: f64,
}

impl LookAhead {
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            distance: config.look_ahead_distance,
            angles: config.look_ahead_angles.clone(),
            self_exclusion_radius: config.self_exclusion_radius,
            lethal_boundary: config.lethal_boundary,
            skip_probability: config.collision_skip_probability,
        }
    }
}

/// Outcome of an imminent-collision query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionCheck {
    pub about_to_hit: bool,
    /// The check was skipped and the previous result reused
    pub skipped: bool,
}

/// Rasterized trail map covering the world at head resolution
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    width: f32,
    height: f32,
    cell_size: f32,
    cols: usize,
    rows: usize,
    cells: Vec<bool>,
}

impl OccupancyGrid {
    pub fn new(width: f32, height: f32, cell_size: f32) -> Self {
        let cols = (width / cell_size).ceil().max(1.0) as usize;
        let rows = (height / cell_size).ceil().max(1.0) as usize;
        Self {
            width,
            height,
            cell_size,
            cols,
            rows,
            cells: vec![false; cols * rows],
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(config.world_width, config.world_height, config.grid_cell_size)
    }

    /// Forget every trail (round start)
    pub fn clear(&mut self) {
        self.cells.fill(false);
    }

    pub fn occupied_cells(&self) -> usize {
        self.cells.iter().filter(|c| **c).count()
    }

    fn cell_index(&self, x: f32, y: f32) -> Option<usize> {
        if !PhysicsSystem::in_world(x, y, self.width, self.height) {
            return None;
        }
        let col = ((x / self.cell_size) as usize).min(self.cols - 1);
        let row = ((y / self.cell_size) as usize).min(self.rows - 1);
        Some(row * self.cols + col)
    }

    /// Whether the cell under a point holds trail. Points off the grid are `None`.
    pub fn is_occupied(&self, x: f32, y: f32) -> Option<bool> {
        self.cell_index(x, y).map(|idx| self.cells[idx])
    }

    /// Mark every cell whose centre lies within `radius` of the point.
    /// Cells past the world edge are clipped.
    pub fn stamp_disc(&mut self, x: f32, y: f32, radius: f32) {
        let r_sq = radius * radius;
        let min_col = ((x - radius) / self.cell_size).floor().max(0.0) as usize;
        let min_row = ((y - radius) / self.cell_size).floor().max(0.0) as usize;
        let max_col = ((x + radius) / self.cell_size).floor();
        let max_row = ((y + radius) / self.cell_size).floor();
        if max_col < 0.0 || max_row < 0.0 {
            return;
        }
        let max_col = (max_col as usize).min(self.cols - 1);
        let max_row = (max_row as usize).min(self.rows - 1);

        for row in min_row..=max_row {
            let cy = (row as f32 + 0.5) * self.cell_size;
            for col in min_col..=max_col {
                let cx = (col as f32 + 0.5) * self.cell_size;
                if PhysicsSystem::distance_sq(x, y, cx, cy) <= r_sq {
                    self.cells[row * self.cols + col] = true;
                }
            }
        }
    }

    /// True when no trail lies within `radius` of the point and the point is on the grid
    pub fn is_area_clear(&self, x: f32, y: f32, radius: f32) -> bool {
        let steps = (radius / self.cell_size).ceil() as i32;
        for dy in -steps..=steps {
            for dx in -steps..=steps {
                let px = x + dx as f32 * self.cell_size;
                let py = y + dy as f32 * self.cell_size;
                if PhysicsSystem::distance_sq(x, y, px, py) > radius * radius {
                    continue;
                }
                match self.is_occupied(px, py) {
                    Some(false) => {}
                    _ => return false,
                }
            }
        }
        true
    }

    /// Sample the fan in front of a head. First occupied sample wins.
    pub fn probe_ahead(&self, x: f32, y: f32, heading: f32, look: &LookAhead) -> bool {
        let exclusion_sq = look.self_exclusion_radius * look.self_exclusion_radius;

        for offset in &look.angles {
            let angle = heading + offset;
            let mut sx = x + angle.cos() * look.distance;
            let mut sy = y + angle.sin() * look.distance;

            if PhysicsSystem::distance_sq(x, y, sx, sy) < exclusion_sq {
                continue;
            }

            if !look.lethal_boundary {
                (sx, sy) = PhysicsSystem::wrap(sx, sy, self.width, self.height);
            }

            match self.is_occupied(sx, sy) {
                Some(false) => {}
                Some(true) | None => return true,
            }
        }
        false
    }

    /// Decide whether continuing forward is fatal for this player. With a small
    /// probability the check is skipped and the player's last result reused.
    pub fn check_imminent_collision<R: Rng>(
        &self,
        player: &PlayerState,
        look: &LookAhead,
        rng: &mut R,
    ) -> CollisionCheck {
        if look.skip_probability > 0.0 && rng.gen_bool(look.skip_probability.min(1.0)) {
            return CollisionCheck {
                about_to_hit: player.reported_hit,
                skipped: true,
            };
        }

        CollisionCheck {
            about_to_hit: self.probe_ahead(player.x, player.y, player.heading, look),
            skipped: false,
        }
    }
}
