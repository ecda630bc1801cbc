//! Room state and the authoritative per-tick pipeline

use std::collections::{HashMap, HashSet};
use std::f32::consts::TAU;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::config::{CollisionAuthority, GameConfig};
use crate::util::time::tick_millis;
use crate::ws::protocol::{ServerMsg, TurnDirection};

use super::combat::{BulletStats, CombatSystem};
use super::occupancy::{LookAhead, OccupancyGrid};
use super::physics::{MovementStats, PhysicsSystem};
use super::player::PlayerState;
use super::powerups::{interior, PowerUpStats, PowerUpSystem};
use super::round::{RoundLifecycle, RoundPhase, RoundResult};
use super::snapshot::{DeltaThresholds, SnapshotEncoder};
use super::ConnectionId;

/// One game session. Commands and ticks both run under the room's lock.
pub struct Room {
    code: String,
    host: ConnectionId,
    players: HashMap<ConnectionId, PlayerState>,
    /// Join order, used for `playerList` and for deterministic iteration
    roster: Vec<ConnectionId>,
    grid: OccupancyGrid,
    power_ups: PowerUpSystem,
    lifecycle: RoundLifecycle,
    encoder: SnapshotEncoder,
    rng: ChaCha8Rng,
    /// Simulated milliseconds since round start
    clock_ms: f64,
    tick: u64,
    tick_ms: f32,
    movement: MovementStats,
    bullet_stats: BulletStats,
    look_ahead: LookAhead,
    config: GameConfig,
    /// Set once the room is torn down. A closed room admits nobody and never ticks.
    closed: bool,
}

impl Room {
    pub fn new(code: String, host: ConnectionId, config: &GameConfig) -> Self {
        Self::with_seed(code, host, config, rand::random())
    }

    /// Room with a fixed RNG seed, for reproducible simulations
    pub fn with_seed(code: String, host: ConnectionId, config: &GameConfig, seed: u64) -> Self {
        let mut room = Self {
            code,
            host,
            players: HashMap::new(),
            roster: Vec::new(),
            grid: OccupancyGrid::from_config(config),
            power_ups: PowerUpSystem::new(PowerUpStats::from_config(config)),
            lifecycle: RoundLifecycle::new(config.win_score),
            encoder: SnapshotEncoder::new(
                config.full_snapshot_interval,
                DeltaThresholds::from_config(config),
            ),
            rng: ChaCha8Rng::seed_from_u64(seed),
            clock_ms: 0.0,
            tick: 0,
            tick_ms: tick_millis(config.tick_rate),
            movement: MovementStats::from_config(config),
            bullet_stats: BulletStats::from_config(config),
            look_ahead: LookAhead::from_config(config),
            config: config.clone(),
            closed: false,
        };
        room.insert_player(host);
        room
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn host(&self) -> ConnectionId {
        self.host
    }

    pub fn phase(&self) -> RoundPhase {
        self.lifecycle.phase()
    }

    pub fn round(&self) -> u32 {
        self.lifecycle.round()
    }

    /// Ticks simulated since the room was created
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn clock_ms(&self) -> u64 {
        self.clock_ms as u64
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.players.contains_key(id)
    }

    pub fn player(&self, id: &ConnectionId) -> Option<&PlayerState> {
        self.players.get(id)
    }

    pub fn players(&self) -> &HashMap<ConnectionId, PlayerState> {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Member ids in join order
    pub fn player_ids(&self) -> Vec<ConnectionId> {
        self.roster.clone()
    }

    pub fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    pub fn power_up_system(&self) -> &PowerUpSystem {
        &self.power_ups
    }

    pub fn player_list(&self) -> ServerMsg {
        ServerMsg::PlayerList {
            players: self.player_ids(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Tear the room down. Must happen under the same lock that decided to close it.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Add a member. Rejected while a round is being played or once the room is closed.
    pub fn add_player(&mut self, id: ConnectionId) -> Result<(), RoomError> {
        if self.closed {
            return Err(RoomError::RoomNotFound(self.code.clone()));
        }
        if self.lifecycle.phase().round_in_progress() {
            return Err(RoomError::GameInProgress);
        }
        if !self.players.contains_key(&id) {
            self.insert_player(id);
        }
        Ok(())
    }

    fn insert_player(&mut self, id: ConnectionId) {
        let (x, y, heading) = self.spawn_point();
        self.players.insert(id, PlayerState::new(id, x, y, heading));
        self.roster.push(id);
        self.encoder.force_next();
    }

    /// Remove a member. Returns the round result if the departure decided the round.
    pub fn remove_player(&mut self, id: &ConnectionId) -> Vec<ServerMsg> {
        if self.players.remove(id).is_none() {
            return Vec::new();
        }
        self.roster.retain(|member| member != id);
        self.encoder.force_next();

        if self.players.is_empty() {
            return Vec::new();
        }
        self.lifecycle
            .evaluate(&mut self.players)
            .map(|result| self.round_message(result))
            .into_iter()
            .collect()
    }

    pub fn set_turning(&mut self, id: &ConnectionId, direction: TurnDirection) {
        if let Some(player) = self.players.get_mut(id).filter(|p| p.alive) {
            player.turning = direction;
        }
    }

    /// Queue one shot for the next tick
    pub fn request_fire(&mut self, id: &ConnectionId) {
        if let Some(player) = self.players.get_mut(id).filter(|p| p.alive) {
            player.fire_requested = true;
        }
    }

    /// Client-side collision report. Only honoured under client-reported authority.
    pub fn report_pixel_state(&mut self, id: &ConnectionId, about_to_hit: bool) {
        match self.config.collision_authority {
            CollisionAuthority::ClientReported => {
                if let Some(player) = self.players.get_mut(id).filter(|p| p.alive) {
                    player.reported_hit = about_to_hit;
                }
            }
            CollisionAuthority::Server => {
                debug!(
                    room_code = %self.code,
                    connection_id = %id,
                    about_to_hit,
                    "Ignoring client collision report"
                );
            }
        }
    }

    /// Host only: begin a game from `Waiting`, or a rematch after `GameOver`
    pub fn start_game(&mut self, requester: &ConnectionId) -> Result<Vec<ServerMsg>, RoomError> {
        self.authorize(requester)?;
        if !self.lifecycle.can_start_game() {
            return Err(RoomError::InvalidPhase(self.lifecycle.phase()));
        }

        self.lifecycle.begin_game(&mut self.players);
        self.reset_round();

        info!(
            room_code = %self.code,
            players = self.players.len(),
            "Game started"
        );

        Ok(vec![
            ServerMsg::GameStarted,
            ServerMsg::RoundStarted {
                round: self.lifecycle.round(),
            },
        ])
    }

    /// Host only: begin the next round after `RoundOver`
    pub fn start_new_round(&mut self, requester: &ConnectionId) -> Result<Vec<ServerMsg>, RoomError> {
        self.authorize(requester)?;
        if !self.lifecycle.can_start_round() {
            return Err(RoomError::InvalidPhase(self.lifecycle.phase()));
        }

        self.lifecycle.begin_round();
        self.reset_round();

        info!(
            room_code = %self.code,
            round = self.lifecycle.round(),
            "Round started"
        );

        Ok(vec![ServerMsg::RoundStarted {
            round: self.lifecycle.round(),
        }])
    }

    fn authorize(&self, requester: &ConnectionId) -> Result<(), RoomError> {
        if *requester == self.host {
            Ok(())
        } else {
            Err(RoomError::UnauthorizedAction)
        }
    }

    fn reset_round(&mut self) {
        self.grid.clear();
        self.power_ups.reset();
        self.clock_ms = 0.0;

        for idx in 0..self.roster.len() {
            let id = self.roster[idx];
            let (x, y, heading) = self.spawn_point();
            if let Some(player) = self.players.get_mut(&id) {
                player.respawn(x, y, heading);
            }
        }

        self.encoder.force_next();
    }

    /// Random interior point clear of trails, with a random heading
    fn spawn_point(&mut self) -> (f32, f32, f32) {
        let (width, height) = (self.config.world_width, self.config.world_height);
        let margin = self.config.spawn_margin;
        let clearance = self.config.head_radius + self.config.look_ahead_distance;

        let mut spot = (width / 2.0, height / 2.0);
        for _ in 0..self.config.spawn_attempts.max(1) {
            spot = (
                interior(&mut self.rng, margin, width),
                interior(&mut self.rng, margin, height),
            );
            if self.grid.is_area_clear(spot.0, spot.1, clearance) {
                break;
            }
        }

        let heading = self.rng.gen_range(0.0..TAU);
        (spot.0, spot.1, heading)
    }

    /// Advance the room by one tick and return everything to broadcast.
    ///
    /// Heads keep moving between rounds so that dead players still respawn;
    /// power-ups and scoring only run while a round is in progress. Nothing
    /// moves before the first start, after the game is over, or once the
    /// room is closed.
    pub fn tick(&mut self) -> Vec<ServerMsg> {
        let phase = self.lifecycle.phase();
        if self.closed || !matches!(phase, RoundPhase::RoundInProgress | RoundPhase::RoundOver) {
            return Vec::new();
        }

        self.tick += 1;
        self.clock_ms += f64::from(self.tick_ms);
        let mut out = Vec::new();

        self.update_respawns();
        self.update_movement();

        let deaths = self.detect_deaths();
        for id in &deaths {
            if let Some(player) = self.players.get_mut(id) {
                player.kill(self.config.respawn_ms);
                debug!(room_code = %self.code, connection_id = %id, "Player died");
            }
        }

        self.stamp_trails();

        let mut power_ups_changed = false;
        if phase.round_in_progress() {
            let update = self.power_ups.update(
                self.clock_ms as u64,
                &mut self.players,
                &self.roster,
                &mut self.rng,
            );
            power_ups_changed = update.changed();

            if let Some(spawned) = &update.spawned {
                out.push(ServerMsg::PowerUpSpawned {
                    power_up: spawned.snapshot(),
                });
            }
            out.extend(update.collected.into_iter().map(|c| ServerMsg::PowerUpCollected {
                player_id: c.player_id,
                power_up_id: c.power_up_id,
                kind: c.kind,
            }));

            if let Some(result) = self.lifecycle.evaluate(&mut self.players) {
                out.push(self.round_message(result));
            }
        }

        if let Some(snapshot) = self.encoder.encode(
            self.tick,
            &self.players,
            &self.power_ups.snapshots(),
            power_ups_changed,
        ) {
            out.push(snapshot);
        }

        out
    }

    fn update_respawns(&mut self) {
        let mut due = Vec::new();
        for id in &self.roster {
            if let Some(player) = self.players.get_mut(id).filter(|p| !p.alive) {
                if player.tick_respawn(self.tick_ms) {
                    due.push(*id);
                }
            }
        }

        for id in due {
            let (x, y, heading) = self.spawn_point();
            if let Some(player) = self.players.get_mut(&id) {
                player.respawn(x, y, heading);
                debug!(room_code = %self.code, connection_id = %id, "Player respawned");
            }
        }
    }

    /// Fire, move heads, advance bullets
    fn update_movement(&mut self) {
        for player in self.players.values_mut().filter(|p| p.alive) {
            CombatSystem::try_fire(player, &self.bullet_stats);

            let (x, y, heading) = PhysicsSystem::step_head(
                player.x,
                player.y,
                player.heading,
                player.turning.factor(),
                &self.movement,
            );
            player.x = x;
            player.y = y;
            player.heading = heading;

            CombatSystem::advance_bullets(player, &self.bullet_stats);
        }
    }

    /// Players to kill this tick. Trail checks see the grid as stamped up to the previous tick.
    fn detect_deaths(&mut self) -> HashSet<ConnectionId> {
        let mut deaths = HashSet::new();

        for id in &self.roster {
            let Some(player) = self.players.get_mut(id) else {
                continue;
            };
            if !player.alive || player.ghost {
                continue;
            }

            let about_to_hit = match self.config.collision_authority {
                CollisionAuthority::Server => {
                    let check =
                        self.grid
                            .check_imminent_collision(player, &self.look_ahead, &mut self.rng);
                    player.reported_hit = check.about_to_hit;
                    check.about_to_hit
                }
                CollisionAuthority::ClientReported => player.reported_hit,
            };

            if about_to_hit {
                deaths.insert(*id);
            }
        }

        for hit in CombatSystem::resolve_hits(&mut self.players, &self.roster, &self.bullet_stats) {
            debug!(
                room_code = %self.code,
                shooter = %hit.shooter_id,
                target = %hit.target_id,
                "Bullet hit"
            );
            deaths.insert(hit.target_id);
        }

        deaths
    }

    fn stamp_trails(&mut self) {
        let radius = self.config.head_radius;
        for player in self.players.values().filter(|p| p.alive && !p.ghost) {
            self.grid.stamp_disc(player.x, player.y, radius);
        }
    }

    fn round_message(&self, result: RoundResult) -> ServerMsg {
        info!(
            room_code = %self.code,
            round = self.lifecycle.round(),
            winner = ?result.winner,
            game_over = result.game_over,
            "Round over"
        );

        if result.game_over {
            ServerMsg::GameOver {
                winner: result.winner,
                scores: result.scores,
            }
        } else {
            ServerMsg::RoundOver {
                winner: result.winner,
                scores: result.scores,
            }
        }
    }
}

/// Room and registry errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("Room {0} not found")]
    RoomNotFound(String),

    #[error("Game already in progress")]
    GameInProgress,

    #[error("Room code already in use")]
    RoomCodeCollision,

    #[error("Only the host can do that")]
    UnauthorizedAction,

    #[error("Not a member of room {0}")]
    NotInRoom(String),

    #[error("Not allowed while the room is {0:?}")]
    InvalidPhase(RoundPhase),
}

impl RoomError {
    /// Wire code for `error` messages
    pub fn code(&self) -> &'static str {
        match self {
            Self::RoomNotFound(_) => "room_not_found",
            Self::GameInProgress => "game_in_progress",
            Self::RoomCodeCollision => "room_code_collision",
            Self::UnauthorizedAction => "unauthorized",
            Self::NotInRoom(_) => "not_in_room",
            Self::InvalidPhase(_) => "invalid_phase",
        }
    }

    /// Whether the requester is told about this failure. Everything else is dropped quietly.
    pub fn is_reported(&self) -> bool {
        matches!(self, Self::RoomNotFound(_) | Self::GameInProgress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn config() -> GameConfig {
        GameConfig {
            collision_skip_probability: 0.0,
            ..GameConfig::default()
        }
    }

    fn two_player_room(config: &GameConfig, seed: u64) -> (Room, ConnectionId, ConnectionId) {
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let mut room = Room::with_seed("AB12".to_string(), host, config, seed);
        room.add_player(guest).unwrap();
        (room, host, guest)
    }

    fn place(room: &mut Room, id: &ConnectionId, x: f32, y: f32, heading: f32) {
        let player = room.players.get_mut(id).unwrap();
        player.x = x;
        player.y = y;
        player.heading = heading;
    }

    #[test]
    fn waiting_room_does_not_simulate() {
        let (mut room, host, guest) = two_player_room(&config(), 1);
        assert_eq!(room.player_ids(), vec![host, guest]);
        assert_eq!(room.phase(), RoundPhase::Waiting);
        assert!(room.tick().is_empty());
        assert_eq!(room.tick_count(), 0);
    }

    #[test]
    fn only_host_starts_and_first_tick_is_full() {
        let (mut room, host, guest) = two_player_room(&config(), 2);

        assert_eq!(room.start_game(&guest), Err(RoomError::UnauthorizedAction));
        assert_eq!(
            room.start_game(&host).unwrap(),
            vec![ServerMsg::GameStarted, ServerMsg::RoundStarted { round: 1 }]
        );
        assert!(matches!(
            room.start_game(&host),
            Err(RoomError::InvalidPhase(RoundPhase::RoundInProgress))
        ));
        assert!(matches!(
            room.start_new_round(&host),
            Err(RoomError::InvalidPhase(_))
        ));

        let out = room.tick();
        assert!(matches!(out.last(), Some(ServerMsg::GameState { players, .. }) if players.len() == 2));
    }

    #[test]
    fn join_rejected_mid_round() {
        let (mut room, host, _) = two_player_room(&config(), 3);
        room.start_game(&host).unwrap();
        assert_eq!(room.add_player(Uuid::new_v4()), Err(RoomError::GameInProgress));
        assert_eq!(room.player_count(), 2);
    }

    #[test]
    fn positions_stay_on_the_torus() {
        let config = GameConfig {
            lethal_boundary: false,
            ..config()
        };
        let (mut room, host, guest) = two_player_room(&config, 4);
        room.start_game(&host).unwrap();
        room.set_turning(&host, TurnDirection::Left);

        for tick in 0..900 {
            if tick % 50 == 0 {
                let direction = if tick % 100 == 0 {
                    TurnDirection::Right
                } else {
                    TurnDirection::Straight
                };
                room.set_turning(&guest, direction);
            }
            room.tick();
            for p in room.players().values() {
                assert!(p.x >= 0.0 && p.x < 1080.0, "x out of range: {}", p.x);
                assert!(p.y >= 0.0 && p.y < 720.0, "y out of range: {}", p.y);
                assert!(p.heading >= 0.0 && p.heading < TAU);
            }
        }
    }

    #[test]
    fn straight_line_through_empty_space_survives() {
        let (mut room, host, guest) = two_player_room(&config(), 5);
        room.start_game(&host).unwrap();
        place(&mut room, &host, 300.0, 200.0, 0.0);
        place(&mut room, &guest, 300.0, 500.0, 0.0);

        for _ in 0..100 {
            room.tick();
        }
        assert!(room.players().values().all(|p| p.alive));
        assert_eq!(room.phase(), RoundPhase::RoundInProgress);
    }

    #[test]
    fn self_trail_crossing_kills_then_respawns_clear_of_trails() {
        let config = GameConfig {
            lethal_boundary: false,
            ..config()
        };
        let (mut room, p1, p2) = two_player_room(&config, 12);
        room.start_game(&p1).unwrap();
        place(&mut room, &p1, 200.0, 200.0, 0.0);
        place(&mut room, &p2, 500.0, 600.0, 0.0);
        room.set_turning(&p1, TurnDirection::Right);

        let mut died_at = None;
        for tick in 1..=200 {
            let out = room.tick();
            if !room.player(&p1).unwrap().alive {
                died_at = Some(tick);
                assert!(out.contains(&ServerMsg::RoundOver {
                    winner: Some(p2),
                    scores: RoundLifecycle::scores(room.players()),
                }));
                break;
            }
        }
        // One lap of the circle is roughly 63 ticks
        let died_at = died_at.expect("circling player never hit its own trail");
        assert!((55..=70).contains(&died_at), "died at tick {}", died_at);
        assert!(room.player(&p2).unwrap().alive);
        assert_eq!(room.player(&p2).unwrap().score, 1);

        let mut dead_ticks = 0;
        loop {
            let before = room.grid().clone();
            room.tick();
            let p = room.player(&p1).unwrap();
            if p.alive {
                assert!(before.is_area_clear(p.x, p.y, 1.0));
                assert_eq!(p.bullet_charges, 0);
                assert!(p.bullets.is_empty());
                assert_eq!(p.turning, TurnDirection::Straight);
                break;
            }
            dead_ticks += 1;
            assert!(dead_ticks < 200, "respawn never happened");
        }
        assert!((178..=181).contains(&dead_ticks), "respawned after {}", dead_ticks);
    }

    #[test]
    fn bullet_kills_and_awards_the_round() {
        let (mut room, shooter, target) = two_player_room(&config(), 6);
        room.start_game(&shooter).unwrap();
        place(&mut room, &shooter, 300.0, 300.0, 0.0);
        place(&mut room, &target, 340.0, 300.0, 0.0);
        room.players.get_mut(&shooter).unwrap().bullet_charges = 1;
        room.request_fire(&shooter);

        let mut result = None;
        for _ in 0..40 {
            let out = room.tick();
            if let Some(msg) = out
                .into_iter()
                .find(|m| matches!(m, ServerMsg::RoundOver { .. }))
            {
                result = Some(msg);
                break;
            }
        }

        match result {
            Some(ServerMsg::RoundOver { winner, scores }) => {
                assert_eq!(winner, Some(shooter));
                assert_eq!(scores[0].player_id, shooter);
                assert_eq!(scores[0].score, 1);
            }
            other => panic!("expected roundOver, got {:?}", other),
        }
        assert!(!room.player(&target).unwrap().alive);
        assert!(room.player(&shooter).unwrap().bullets.is_empty());
        assert_eq!(room.phase(), RoundPhase::RoundOver);
    }

    #[test]
    fn pixel_state_only_counts_under_client_authority() {
        let (mut room, host, guest) = two_player_room(&config(), 7);
        room.start_game(&host).unwrap();
        place(&mut room, &host, 300.0, 200.0, 0.0);
        place(&mut room, &guest, 300.0, 500.0, 0.0);
        room.report_pixel_state(&guest, true);
        room.tick();
        assert!(room.player(&guest).unwrap().alive);

        let client = GameConfig {
            collision_authority: CollisionAuthority::ClientReported,
            ..config()
        };
        let (mut room, host, guest) = two_player_room(&client, 7);
        room.start_game(&host).unwrap();
        room.report_pixel_state(&guest, true);
        let out = room.tick();
        assert!(!room.player(&guest).unwrap().alive);
        assert!(out
            .iter()
            .any(|m| matches!(m, ServerMsg::RoundOver { winner: Some(w), .. } if *w == host)));
    }

    #[test]
    fn reaching_win_score_ends_game_and_rematch_resets() {
        let client = GameConfig {
            collision_authority: CollisionAuthority::ClientReported,
            win_score: 2,
            ..config()
        };
        let (mut room, host, guest) = two_player_room(&client, 8);
        room.start_game(&host).unwrap();

        room.report_pixel_state(&guest, true);
        room.tick();
        assert_eq!(room.phase(), RoundPhase::RoundOver);
        assert_eq!(room.start_new_round(&guest), Err(RoomError::UnauthorizedAction));
        assert_eq!(
            room.start_new_round(&host).unwrap(),
            vec![ServerMsg::RoundStarted { round: 2 }]
        );
        assert_eq!(room.grid().occupied_cells(), 0);
        assert!(room.players().values().all(|p| p.alive));

        room.report_pixel_state(&guest, true);
        let out = room.tick();
        assert!(out
            .iter()
            .any(|m| matches!(m, ServerMsg::GameOver { winner: Some(w), .. } if *w == host)));
        assert_eq!(room.phase(), RoundPhase::GameOver);
        assert!(room.tick().is_empty());

        room.start_game(&host).unwrap();
        assert!(room.players().values().all(|p| p.score == 0));
        assert_eq!(room.round(), 1);
    }

    #[test]
    fn departure_forces_full_snapshot_and_can_decide_round() {
        let (mut room, host, guest) = two_player_room(&config(), 9);
        let third = Uuid::new_v4();
        room.add_player(third).unwrap();
        room.start_game(&host).unwrap();
        place(&mut room, &host, 300.0, 200.0, 0.0);
        place(&mut room, &guest, 300.0, 400.0, 0.0);
        place(&mut room, &third, 300.0, 600.0, 0.0);
        room.tick();

        room.players.get_mut(&third).unwrap().kill(3000.0);
        let out = room.remove_player(&guest);
        assert!(matches!(
            out.as_slice(),
            [ServerMsg::RoundOver { winner: Some(w), .. }] if *w == host
        ));
        assert_eq!(room.player_ids(), vec![host, third]);

        let out = room.tick();
        assert!(matches!(out.last(), Some(ServerMsg::GameState { players, .. }) if players.len() == 2));
    }

    #[test]
    fn closed_room_admits_nobody_and_stops_ticking() {
        let (mut room, host, _) = two_player_room(&config(), 12);
        room.start_game(&host).unwrap();
        assert!(!room.tick().is_empty());

        room.close();
        assert!(room.is_closed());
        let ticks = room.tick_count();
        assert!(room.tick().is_empty());
        assert_eq!(room.tick_count(), ticks);
        assert_eq!(
            room.add_player(Uuid::new_v4()),
            Err(RoomError::RoomNotFound("AB12".to_string()))
        );
    }

    #[test]
    fn ghosts_leave_no_trail_and_pass_through_walls() {
        let (mut room, host, guest) = two_player_room(&config(), 13);
        room.start_game(&host).unwrap();
        place(&mut room, &host, 300.0, 200.0, 0.0);
        place(&mut room, &guest, 300.0, 500.0, 0.0);
        room.players.get_mut(&host).unwrap().ghost = true;
        for y in 170..=230 {
            room.grid.stamp_disc(320.0, y as f32, 2.0);
        }

        for _ in 0..30 {
            room.tick();
        }

        assert!(room.player(&host).unwrap().alive);
        assert!(room.player(&host).unwrap().x > 330.0);
        assert_eq!(room.grid().is_occupied(310.0, 200.0), Some(false));
        assert_eq!(room.grid().is_occupied(310.0, 500.0), Some(true));
    }

    #[test]
    fn same_seed_same_simulation() {
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let run = || {
            let mut room = Room::with_seed("SEED".to_string(), host, &GameConfig::default(), 99);
            room.add_player(guest).unwrap();
            room.start_game(&host).unwrap();
            room.set_turning(&guest, TurnDirection::Left);
            for _ in 0..300 {
                room.tick();
            }
            let mut snapshots: Vec<_> = room.players().values().map(PlayerState::snapshot).collect();
            snapshots.sort_by_key(|p| p.id);
            (snapshots, room.power_up_system().snapshots())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn error_codes_and_reporting() {
        assert_eq!(RoomError::RoomNotFound("ZZZZ".into()).code(), "room_not_found");
        assert!(RoomError::GameInProgress.is_reported());
        assert!(!RoomError::UnauthorizedAction.is_reported());
    }
}
