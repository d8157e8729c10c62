//! Meeting room record and write payloads.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Room {
    pub id: i64,
    pub name: String,
    pub capacity: i32,
}

impl Room {
    /// Display label, e.g. "Meeting Room 1 (30)".
    pub fn title(&self) -> String {
        format!("{} ({})", self.name, self.capacity)
    }

    pub fn to_draft(&self) -> RoomDraft {
        RoomDraft {
            name: self.name.clone(),
            capacity: self.capacity,
        }
    }
}

impl Serialize for Room {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Room", 4)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("capacity", &self.capacity)?;
        s.serialize_field("title", &self.title())?;
        s.end()
    }
}

/// Body for POST and PUT, also the validated write model.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RoomDraft {
    pub name: String,
    pub capacity: i32,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RoomPatch {
    pub name: Option<String>,
    pub capacity: Option<i32>,
}

impl RoomPatch {
    pub fn apply(self, mut draft: RoomDraft) -> RoomDraft {
        if let Some(v) = self.name {
            draft.name = v;
        }
        if let Some(v) = self.capacity {
            draft.capacity = v;
        }
        draft
    }
}
