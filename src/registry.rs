//! Room directory: maps short join codes to live room handles.

use crate::room::{Room, RoomHandle};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// Safe character set for room codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 5;

fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Shared directory of active rooms. Rooms notify back through a channel
/// when they dispose so the reaper task can drop their handles.
#[derive(Clone)]
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<String, RoomHandle>>>,
    disposed: mpsc::UnboundedSender<String>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        let rooms: Arc<RwLock<HashMap<String, RoomHandle>>> =
            Arc::new(RwLock::new(HashMap::new()));
        let (disposed_tx, mut disposed_rx) = mpsc::unbounded_channel::<String>();

        let reaper_rooms = rooms.clone();
        tokio::spawn(async move {
            while let Some(code) = disposed_rx.recv().await {
                reaper_rooms.write().await.remove(&code);
                tracing::info!(code = %code, "Removed disposed room from registry");
            }
        });

        Self {
            rooms,
            disposed: disposed_tx,
        }
    }

    /// Spawn a fresh room under a unique code.
    pub async fn create_room(&self) -> RoomHandle {
        let mut rooms = self.rooms.write().await;
        // Collision-check against active rooms (extremely rare with ~28M codes)
        let code = loop {
            let code = generate_room_code();
            if !rooms.contains_key(&code) {
                break code;
            }
        };
        let handle = Room::spawn(code.clone(), self.disposed.clone());
        rooms.insert(code.clone(), handle.clone());
        tracing::info!(code = %code, "Created room");
        handle
    }

    /// Case-insensitive lookup of an active room.
    pub async fn find(&self, code: &str) -> Option<RoomHandle> {
        self.rooms.read().await.get(&code.to_uppercase()).cloned()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
