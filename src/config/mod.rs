//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit newline-delimited JSON logs instead of human-readable lines
    pub log_json: bool,
    /// Allowed client origins for CORS, comma-separated ("*" allows any)
    pub client_origin: String,
    /// Max inbound command frames per second per connection
    pub input_rate_limit: u32,
    /// Capacity of each connection's outbound queue
    pub outbox_capacity: usize,
    /// Simulation tunables
    pub game: GameConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        };

        let mut game = GameConfig::default();
        game.tick_rate = env_parse("TICK_RATE", game.tick_rate)?;
        game.win_score = env_parse("WIN_SCORE", game.win_score)?;
        game.world_width = env_parse("WORLD_WIDTH", game.world_width)?;
        game.world_height = env_parse("WORLD_HEIGHT", game.world_height)?;
        game.respawn_ms = env_parse("RESPAWN_MS", game.respawn_ms)?;
        game.collision_authority = env_parse("COLLISION_AUTHORITY", game.collision_authority)?;
        game.lethal_boundary = env_parse("LETHAL_BOUNDARY", game.lethal_boundary)?;
        game.validate()?;

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")),
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),
            input_rate_limit: env_parse("INPUT_RATE_LIMIT", 120)?,
            outbox_capacity: env_parse("OUTBOX_CAPACITY", 64)?,
            game,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log_level: "info".to_string(),
            log_json: false,
            client_origin: "*".to_string(),
            input_rate_limit: 120,
            outbox_capacity: 64,
            game: GameConfig::default(),
        }
    }
}

/// Read an optional environment variable, falling back to `default` when unset
fn env_parse<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

/// Who decides that a player ran into a trail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionAuthority {
    /// The server's occupancy grid decides; client `pixelState` reports are ignored
    Server,
    /// Legacy contract: the client's own `pixelState` flag kills the player.
    /// Non-authoritative input, trivially spoofable.
    ClientReported,
}

impl FromStr for CollisionAuthority {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "server" => Ok(Self::Server),
            "client" | "client_reported" => Ok(Self::ClientReported),
            _ => Err(()),
        }
    }
}

/// Simulation tunables. Speeds and rates are per tick, durations in milliseconds.
#[derive(Clone, Debug)]
pub struct GameConfig {
    pub world_width: f32,
    pub world_height: f32,
    /// Simulation ticks per second
    pub tick_rate: u32,

    pub turn_rate: f32,
    pub movement_speed: f32,
    pub bullet_speed: f32,
    /// Distance a bullet travels before it is discarded
    pub bullet_range: f32,

    pub head_radius: f32,
    pub bullet_hitbox_radius: f32,
    /// Occupancy grid cell edge in world units
    pub grid_cell_size: f32,
    pub look_ahead_distance: f32,
    /// Angle offsets sampled around the heading, in check order
    pub look_ahead_angles: Vec<f32>,
    pub self_exclusion_radius: f32,
    /// Look-ahead samples past the world edge count as a hit. When false the
    /// samples wrap like the heads do.
    pub lethal_boundary: bool,
    /// Probability that a player's trail check is skipped for a tick
    pub collision_skip_probability: f64,
    pub collision_authority: CollisionAuthority,

    pub respawn_ms: f32,
    /// Keep spawns this far from the world edge
    pub spawn_margin: f32,
    pub spawn_attempts: u32,

    pub power_up_spawn_interval_ms: u64,
    pub power_up_duration_ms: u64,
    pub power_up_collection_radius: f32,
    pub power_up_size: f32,
    pub power_up_bullet_bonus: u32,

    pub win_score: u32,

    /// Every Nth tick is a full snapshot
    pub full_snapshot_interval: u32,
    pub delta_min_distance: f32,
    pub delta_min_angle: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            world_width: 1080.0,
            world_height: 720.0,
            tick_rate: 60,
            turn_rate: 0.1,
            movement_speed: 1.5,
            bullet_speed: 3.0,
            bullet_range: 200.0,
            head_radius: 2.0,
            bullet_hitbox_radius: 6.0,
            grid_cell_size: 1.0,
            look_ahead_distance: 3.0,
            look_ahead_angles: vec![-0.2, 0.0, 0.2],
            self_exclusion_radius: 2.0,
            lethal_boundary: true,
            collision_skip_probability: 0.2,
            collision_authority: CollisionAuthority::Server,
            respawn_ms: 3000.0,
            spawn_margin: 40.0,
            spawn_attempts: 32,
            power_up_spawn_interval_ms: 10_000,
            power_up_duration_ms: 15_000,
            power_up_collection_radius: 25.0,
            power_up_size: 5.0,
            power_up_bullet_bonus: 3,
            win_score: 5,
            full_snapshot_interval: 30,
            delta_min_distance: 0.5,
            delta_min_angle: 0.01,
        }
    }
}

impl GameConfig {
    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.world_width > 0.0) {
            return Err(ConfigError::Invalid("WORLD_WIDTH"));
        }
        if !(self.world_height > 0.0) {
            return Err(ConfigError::Invalid("WORLD_HEIGHT"));
        }
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid("TICK_RATE"));
        }
        if self.win_score == 0 {
            return Err(ConfigError::Invalid("WIN_SCORE"));
        }
        if !(self.grid_cell_size > 0.0) {
            return Err(ConfigError::Invalid("grid_cell_size"));
        }
        if self.full_snapshot_interval == 0 {
            return Err(ConfigError::Invalid("full_snapshot_interval"));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
