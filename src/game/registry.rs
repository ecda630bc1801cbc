//! Room registry: live rooms, connection membership and message routing

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::Rng;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::GameConfig;
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::room::{Room, RoomError};
use super::ConnectionId;

/// Room codes are drawn from this alphabet
const ROOM_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ROOM_CODE_LEN: usize = 4;

/// Shared handle to a live room
pub type RoomHandle = Arc<Mutex<Room>>;

/// Outbound side of a connected socket
#[derive(Clone)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub outbox: mpsc::Sender<ServerMsg>,
    /// Room this connection is a member of
    pub room: Option<String>,
}

/// Draw a random room code
pub fn generate_room_code<R: Rng>(rng: &mut R) -> String {
    (0..ROOM_CODE_LEN)
        .map(|_| ROOM_CODE_CHARSET[rng.gen_range(0..ROOM_CODE_CHARSET.len())] as char)
        .collect()
}

/// Registry of all live rooms and connected sockets
pub struct RoomRegistry {
    config: GameConfig,
    outbox_capacity: usize,
    rooms: DashMap<String, RoomHandle>,
    connections: DashMap<ConnectionId, ConnectionHandle>,
}

impl RoomRegistry {
    pub fn new(config: GameConfig, outbox_capacity: usize) -> Self {
        Self {
            config,
            outbox_capacity: outbox_capacity.max(1),
            rooms: DashMap::new(),
            connections: DashMap::new(),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Register a new socket. Returns its id and the receiving end of its outbox.
    pub fn connect(&self) -> (ConnectionId, mpsc::Receiver<ServerMsg>) {
        let id = Uuid::new_v4();
        let (outbox, rx) = mpsc::channel(self.outbox_capacity);
        self.connections.insert(
            id,
            ConnectionHandle {
                id,
                outbox,
                room: None,
            },
        );
        debug!(connection_id = %id, "Connection registered");
        (id, rx)
    }

    /// Drop a socket, leaving its room first. Same effect as an explicit leave.
    pub fn remove_connection(&self, conn: ConnectionId) {
        self.leave_room(conn);
        if self.connections.remove(&conn).is_some() {
            debug!(connection_id = %conn, "Connection removed");
        }
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn connected_players(&self) -> usize {
        self.connections.len()
    }

    pub fn room_handle(&self, code: &str) -> Option<RoomHandle> {
        self.rooms.get(code).map(|r| r.value().clone())
    }

    /// Snapshot of every live room, so no map guard is held while rooms are locked
    pub fn room_handles(&self) -> Vec<(String, RoomHandle)> {
        self.rooms
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    /// Room the connection currently belongs to
    pub fn room_of(&self, conn: ConnectionId) -> Option<String> {
        self.connections.get(&conn).and_then(|c| c.room.clone())
    }

    /// Allocate a fresh room with `host` as its first member
    pub fn create_room(&self, host: ConnectionId) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let code = generate_room_code(&mut rng);
            match self.create_room_with_code(host, &code) {
                Ok(()) => return code,
                Err(e) => debug!(room_code = %code, error = %e, "Retrying room code"),
            }
        }
    }

    /// Allocate a room under a specific code. Fails with `RoomCodeCollision` if it is taken.
    pub fn create_room_with_code(&self, host: ConnectionId, code: &str) -> Result<(), RoomError> {
        if self.rooms.contains_key(code) {
            return Err(RoomError::RoomCodeCollision);
        }
        self.leave_room(host);

        match self.rooms.entry(code.to_string()) {
            Entry::Occupied(_) => return Err(RoomError::RoomCodeCollision),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(Room::new(
                    code.to_string(),
                    host,
                    &self.config,
                ))));
            }
        }

        self.set_membership(host, Some(code.to_string()));
        info!(room_code = %code, host = %host, "Room created");

        self.send_to(
            host,
            ServerMsg::RoomCreated {
                room_code: code.to_string(),
            },
        );
        self.send_to(host, ServerMsg::PlayerList { players: vec![host] });
        Ok(())
    }

    /// Add a connection to an existing room
    pub fn join_room(&self, conn: ConnectionId, code: &str) -> Result<(), RoomError> {
        let handle = self
            .room_handle(code)
            .ok_or_else(|| RoomError::RoomNotFound(code.to_string()))?;

        if self.room_of(conn).as_deref() == Some(code) {
            return Ok(());
        }
        if handle.lock().phase().round_in_progress() {
            return Err(RoomError::GameInProgress);
        }

        self.leave_room(conn);

        // Membership and the join messages go out under the room lock, so a
        // concurrent close either sees this member or turns the join away.
        let mut room = handle.lock();
        room.add_player(conn)?;
        self.set_membership(conn, Some(code.to_string()));

        let members = room.player_ids();
        info!(
            room_code = %code,
            connection_id = %conn,
            players = members.len(),
            "Player joined room"
        );

        self.send_to(
            conn,
            ServerMsg::RoomJoined {
                room_code: code.to_string(),
                host: room.host(),
            },
        );
        self.broadcast(&members, vec![room.player_list()]);
        Ok(())
    }

    /// Take a connection out of its room. Closes the room when the host leaves
    /// or nobody is left.
    pub fn leave_room(&self, conn: ConnectionId) {
        let Some(code) = self
            .connections
            .get_mut(&conn)
            .and_then(|mut c| c.room.take())
        else {
            return;
        };
        let Some(handle) = self.room_handle(&code) else {
            return;
        };

        let (mut outgoing, close, members) = {
            let mut room = handle.lock();
            let outgoing = room.remove_player(&conn);
            let close = room.host() == conn || room.is_empty();
            if close {
                room.close();
            }
            (outgoing, close, room.player_ids())
        };

        info!(room_code = %code, connection_id = %conn, "Player left room");

        if close {
            self.rooms.remove(&code);
            for member in &members {
                self.clear_membership(*member, &code);
            }
            self.broadcast(
                &members,
                vec![ServerMsg::RoomClosed {
                    room_code: code.clone(),
                }],
            );
            info!(room_code = %code, "Room closed");
            return;
        }

        outgoing.push(ServerMsg::PlayerList {
            players: members.clone(),
        });
        self.broadcast(&members, outgoing);
    }

    /// Dispatch one inbound command. Failures worth telling the client about go
    /// back as `error`; everything else is dropped.
    pub fn handle_command(&self, conn: ConnectionId, msg: ClientMsg) {
        let result = match msg {
            ClientMsg::CreateRoom => {
                self.create_room(conn);
                Ok(())
            }
            ClientMsg::JoinRoom { room_code } => self.join_room(conn, &room_code),
            ClientMsg::LeaveRoom => {
                self.leave_room(conn);
                Ok(())
            }
            ClientMsg::Ping { t } => {
                self.send_to(conn, ServerMsg::Pong { t });
                Ok(())
            }
            other => self.room_command(conn, other),
        };

        if let Err(e) = result {
            if e.is_reported() {
                self.send_to(
                    conn,
                    ServerMsg::Error {
                        code: e.code().to_string(),
                        message: e.to_string(),
                    },
                );
            } else {
                debug!(connection_id = %conn, error = %e, "Ignoring command");
            }
        }
    }

    /// Commands scoped to the sender's current room
    fn room_command(&self, conn: ConnectionId, msg: ClientMsg) -> Result<(), RoomError> {
        let code = msg.room_code().unwrap_or_default();
        if self.room_of(conn).as_deref() != Some(code) {
            return Err(RoomError::NotInRoom(code.to_string()));
        }
        let handle = self
            .room_handle(code)
            .ok_or_else(|| RoomError::RoomNotFound(code.to_string()))?;

        let (outgoing, members) = {
            let mut room = handle.lock();
            if room.is_closed() {
                return Err(RoomError::RoomNotFound(code.to_string()));
            }
            let outgoing = match msg {
                ClientMsg::Turn { direction, .. } => {
                    room.set_turning(&conn, direction);
                    Vec::new()
                }
                ClientMsg::Shoot { .. } => {
                    room.request_fire(&conn);
                    Vec::new()
                }
                ClientMsg::PixelState {
                    is_about_to_hit, ..
                } => {
                    room.report_pixel_state(&conn, is_about_to_hit);
                    Vec::new()
                }
                ClientMsg::StartGame { .. } => room.start_game(&conn)?,
                ClientMsg::StartNewRound { .. } => room.start_new_round(&conn)?,
                _ => Vec::new(),
            };
            (outgoing, room.player_ids())
        };

        self.broadcast(&members, outgoing);
        Ok(())
    }

    /// Advance every live room by one tick and broadcast what it produced.
    /// Rooms closed since the handles were collected are skipped. Returns the
    /// number of rooms ticked.
    pub fn tick_rooms(&self) -> usize {
        let mut ticked = 0;
        for (_, handle) in self.room_handles() {
            let (outgoing, members) = {
                let mut room = handle.lock();
                if room.is_closed() {
                    continue;
                }
                (room.tick(), room.player_ids())
            };
            ticked += 1;
            self.broadcast(&members, outgoing);
        }
        ticked
    }

    fn set_membership(&self, conn: ConnectionId, room: Option<String>) {
        if let Some(mut handle) = self.connections.get_mut(&conn) {
            handle.room = room;
        }
    }

    /// Forget `code` for this connection, unless it has already moved on to another room
    fn clear_membership(&self, conn: ConnectionId, code: &str) {
        if let Some(mut handle) = self.connections.get_mut(&conn) {
            if handle.room.as_deref() == Some(code) {
                handle.room = None;
            }
        }
    }

    /// Fire-and-forget delivery to one connection
    pub fn send_to(&self, conn: ConnectionId, msg: ServerMsg) {
        let Some(outbox) = self.connections.get(&conn).map(|c| c.outbox.clone()) else {
            return;
        };
        match outbox.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(connection_id = %conn, "Outbox full, dropping message");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(connection_id = %conn, "Outbox closed");
            }
        }
    }

    fn broadcast(&self, members: &[ConnectionId], msgs: Vec<ServerMsg>) {
        for msg in msgs {
            for member in members {
                self.send_to(*member, msg.clone());
            }
        }
    }
}
