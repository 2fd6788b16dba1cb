use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_WORLD_WIDTH: f32 = 100.0;
pub const DEFAULT_WORLD_HEIGHT: f32 = 100.0;
/// Map size the class radii and speeds are tuned for.
pub const REFERENCE_WORLD_SIZE: f32 = 100.0;

pub const TICK_INTERVAL_MS: u64 = 50;
/// Logical seconds one simulation tick advances, independent of wall-clock jitter.
pub const TICK_DT: f32 = TICK_INTERVAL_MS as f32 / 1000.0;
pub const BROADCAST_INTERVAL_MS: u64 = 200;

/// Upper bound for a single newline-delimited JSON frame.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterClass {
    Warrior,
    Mage,
}

impl CharacterClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            CharacterClass::Warrior => "warrior",
            CharacterClass::Mage => "mage",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterState {
    #[default]
    Idle,
    Running,
    Attacking,
    Dying,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageType {
    Physical,
    Magical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Spawn,
    Move,
    Attack,
    Disconnect,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Spawn => "SPAWN",
            CommandKind::Move => "MOVE",
            CommandKind::Attack => "ATTACK",
            CommandKind::Disconnect => "DISCONNECT",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "SPAWN" => Some(CommandKind::Spawn),
            "MOVE" => Some(CommandKind::Move),
            "ATTACK" => Some(CommandKind::Attack),
            "DISCONNECT" => Some(CommandKind::Disconnect),
            _ => None,
        }
    }
}

/// Command as it travels over the wire. The server validates it into a typed
/// command before touching the world, so every field tolerates absence here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireCommand {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub character_id: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl WireCommand {
    fn new(kind: CommandKind, character_id: &str, data: Value) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            character_id: character_id.to_string(),
            data,
        }
    }

    pub fn spawn(character_id: &str) -> Self {
        Self::new(CommandKind::Spawn, character_id, Value::Null)
    }

    pub fn move_by(character_id: &str, dx: f32, dy: f32) -> Self {
        Self::new(
            CommandKind::Move,
            character_id,
            serde_json::json!({ "dx": dx, "dy": dy }),
        )
    }

    pub fn attack(character_id: &str, target_id: Option<&str>) -> Self {
        let data = match target_id {
            Some(target) => serde_json::json!({ "target_id": target }),
            None => serde_json::json!({}),
        };
        Self::new(CommandKind::Attack, character_id, data)
    }

    pub fn disconnect(character_id: &str) -> Self {
        Self::new(CommandKind::Disconnect, character_id, Value::Null)
    }

    /// Serializes the command as one newline-terminated frame.
    pub fn to_frame(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovePayload {
    pub dx: f32,
    pub dy: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttackPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
}

/// Read-only projection of one character for transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSnapshot {
    pub id: String,
    pub class: CharacterClass,
    pub state: CharacterState,
    pub health: f32,
    pub x: f32,
    pub y: f32,
    pub flash: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub characters: Vec<CharacterSnapshot>,
}

impl Snapshot {
    pub fn get(&self, id: &str) -> Option<&CharacterSnapshot> {
        self.characters.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub error: String,
}

/// Everything the server pushes to a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Snapshot(Snapshot),
    Error(ErrorMessage),
}

pub fn distance(ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    (bx - ax).hypot(by - ay)
}
