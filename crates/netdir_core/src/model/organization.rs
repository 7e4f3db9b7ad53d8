//! Organization record and embedded rooms.
//!
//! # Responsibility
//! - Define organization/room shapes and their stored field names.
//! - Normalize loosely-typed room input (imports, JSON drafts) into strict
//!   typed rooms.
//!
//! # Invariants
//! - `Room::seats` is non-negative; negative or unparsable input becomes 0.
//! - Amenity flags are strict booleans regardless of input type.

use super::color_grade::ColorGrade;
use super::EntityId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RoomType {
    #[default]
    #[serde(rename = "Meeting Room")]
    MeetingRoom,
    #[serde(rename = "Event Saloon", alias = "Event Hall")]
    EventHall,
    Office,
    Lab,
    Studio,
    #[serde(other)]
    Other,
}

impl RoomType {
    pub const ALL: [RoomType; 6] = [
        RoomType::MeetingRoom,
        RoomType::EventHall,
        RoomType::Office,
        RoomType::Lab,
        RoomType::Studio,
        RoomType::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::MeetingRoom => "Meeting Room",
            Self::EventHall => "Event Saloon",
            Self::Office => "Office",
            Self::Lab => "Lab",
            Self::Studio => "Studio",
            Self::Other => "Other",
        }
    }

    /// Parses a room type label case-insensitively; `Event Hall` is accepted
    /// as an alias of `Event Saloon`.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("event hall") {
            return Some(Self::EventHall);
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(trimmed))
    }
}

/// GSM signal quality inside a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GsmSignal {
    #[default]
    Good,
    Fair,
    Poor,
    #[serde(other)]
    None,
}

impl GsmSignal {
    pub const ALL: [GsmSignal; 4] = [
        GsmSignal::Good,
        GsmSignal::Fair,
        GsmSignal::Poor,
        GsmSignal::None,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
            Self::None => "None",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|signal| signal.label().eq_ignore_ascii_case(trimmed))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Room {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: RoomType,
    pub seats: u32,
    #[serde(rename = "hasTV")]
    pub has_tv: bool,
    #[serde(rename = "hasProjector")]
    pub has_projector: bool,
    #[serde(rename = "hasSpeakers")]
    pub has_speakers: bool,
    #[serde(rename = "hasCameras")]
    pub has_cameras: bool,
    /// Fixed (wired) internet access.
    #[serde(rename = "hasInternet")]
    pub has_internet: bool,
    #[serde(rename = "gsmSignal")]
    pub gsm_signal: GsmSignal,
}

impl Room {
    /// Builds a room from loosely-typed JSON.
    ///
    /// Rules:
    /// - `name`: string, otherwise empty.
    /// - `type` / `gsmSignal`: known label, otherwise the default.
    /// - `seats`: integer prefix of a number or numeric string, clamped at 0.
    /// - amenity flags: truthiness of the JSON value.
    pub fn from_loose_value(value: &Value) -> Self {
        Self {
            name: loose_string(value.get("name")),
            kind: value
                .get("type")
                .and_then(Value::as_str)
                .and_then(RoomType::parse)
                .unwrap_or_default(),
            seats: loose_seats(value.get("seats")),
            has_tv: is_truthy(value.get("hasTV")),
            has_projector: is_truthy(value.get("hasProjector")),
            has_speakers: is_truthy(value.get("hasSpeakers")),
            has_cameras: is_truthy(value.get("hasCameras")),
            has_internet: is_truthy(value.get("hasInternet")),
            gsm_signal: value
                .get("gsmSignal")
                .and_then(Value::as_str)
                .and_then(GsmSignal::parse)
                .unwrap_or_default(),
        }
    }
}

/// Normalizes a JSON room list. Non-array input yields `None`.
pub fn rooms_from_loose_value(value: &Value) -> Option<Vec<Room>> {
    value
        .as_array()
        .map(|items| items.iter().map(Room::from_loose_value).collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Organization {
    #[serde(skip)]
    pub id: EntityId,
    pub name: String,
    pub address: String,
    pub website: String,
    pub phone: String,
    pub logo_url: String,
    pub color_grade: ColorGrade,
    pub rooms: Vec<Room>,
    pub created_at: String,
}

impl Organization {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builds an organization draft from loosely-typed JSON (form payloads,
    /// hand-written files), applying the same defaults as the save path.
    ///
    /// An `id` key, when present, selects the record to replace.
    pub fn from_loose_json(value: &Value) -> Self {
        Self {
            id: loose_string(value.get("id")),
            name: loose_string(value.get("name")),
            address: loose_string(value.get("address")),
            website: loose_string(value.get("website")),
            phone: loose_string(value.get("phone")),
            logo_url: loose_string(value.get("logoUrl")),
            color_grade: value
                .get("colorGrade")
                .and_then(Value::as_str)
                .map(ColorGrade::parse_or_default)
                .unwrap_or_default(),
            rooms: value
                .get("rooms")
                .and_then(rooms_from_loose_value)
                .unwrap_or_default(),
            created_at: loose_string(value.get("createdAt")),
        }
    }

    pub fn total_seats(&self) -> u64 {
        self.rooms.iter().map(|room| u64::from(room.seats)).sum()
    }
}

fn loose_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn loose_seats(value: Option<&Value>) -> u32 {
    let parsed = match value {
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|n| n.trunc() as i64)),
        Some(Value::String(text)) => parse_integer_prefix(text),
        _ => None,
    };
    parsed
        .map(|seats| seats.clamp(0, i64::from(u32::MAX)) as u32)
        .unwrap_or(0)
}

/// Parses a leading base-10 integer, ignoring trailing garbage (`"12 seats"`).
fn parse_integer_prefix(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .bytes()
        .position(|byte| !byte.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}
