//! Room Registry.
//!
//! Maps a room id to its [`Room`] actor address, creating one lazily on
//! first reference and never removing it for the lifetime of the
//! process — there is no clustering to coordinate a room's teardown
//! across.

use std::{collections::HashMap, sync::Mutex};

use actix::{Actor, Addr};

use super::room::Room;

#[derive(Default)]
pub struct RoomsRepository {
    rooms: Mutex<HashMap<String, Addr<Room>>>,
}

impl RoomsRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the address of the room named `id`, creating it first if
    /// this is the first reference to it.
    pub fn get_or_create(&self, id: &str) -> Addr<Room> {
        let mut rooms = self.rooms.lock().unwrap();
        rooms
            .entry(id.to_owned())
            .or_insert_with(|| Room::new(id.to_owned()).start())
            .clone()
    }

    #[cfg(test)]
    pub fn room_count(&self) -> usize {
        self.rooms.lock().unwrap().len()
    }
}
