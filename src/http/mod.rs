//! HTTP surface: health, room lookup and the WebSocket upgrade

pub mod routes;

pub use routes::build_router;
