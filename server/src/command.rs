//! Command pipeline: turns untrusted wire commands into validated intents and
//! applies them to the [`World`].
//!
//! Decoding is total and happens before any lock is taken. Every handler checks
//! all of its preconditions before mutating, so a rejected command leaves the
//! world exactly as it found it.

use crate::entity::Hit;
use crate::error::{CommandError, ValidationError};
use crate::event_log::EventLog;
use crate::world::World;
use log::debug;
use serde_json::Value;
use shared::{distance, AttackPayload, CharacterClass, CommandKind, MovePayload, WireCommand};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum CommandAction {
    Spawn,
    /// Relative step request; the server decides how far the character goes.
    Move { dx: f32, dy: f32 },
    Attack { target_id: Option<String> },
    Disconnect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub character_id: String,
    pub action: CommandAction,
}

impl Command {
    pub fn new(character_id: impl Into<String>, action: CommandAction) -> Self {
        Self {
            character_id: character_id.into(),
            action,
        }
    }

    pub fn kind(&self) -> CommandKind {
        match self.action {
            CommandAction::Spawn => CommandKind::Spawn,
            CommandAction::Move { .. } => CommandKind::Move,
            CommandAction::Attack { .. } => CommandKind::Attack,
            CommandAction::Disconnect => CommandKind::Disconnect,
        }
    }

    /// Validates one decoded JSON frame.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let wire: WireCommand =
            serde_json::from_value(value).map_err(|e| ValidationError::Malformed(e.to_string()))?;
        Self::try_from(wire)
    }
}

impl TryFrom<WireCommand> for Command {
    type Error = ValidationError;

    fn try_from(wire: WireCommand) -> Result<Self, Self::Error> {
        if wire.kind.is_empty() {
            return Err(ValidationError::MissingType);
        }
        let kind =
            CommandKind::parse(&wire.kind).ok_or_else(|| ValidationError::UnknownType(wire.kind.clone()))?;
        if wire.character_id.is_empty() {
            return Err(ValidationError::MissingCharacterId);
        }

        let action = match kind {
            CommandKind::Spawn => CommandAction::Spawn,
            CommandKind::Disconnect => CommandAction::Disconnect,
            CommandKind::Move => {
                let payload: MovePayload =
                    serde_json::from_value(wire.data).map_err(|e| invalid_payload(kind, e))?;
                if !payload.dx.is_finite() || !payload.dy.is_finite() {
                    return Err(ValidationError::InvalidPayload {
                        kind: kind.as_str(),
                        reason: "dx and dy must be finite numbers".to_string(),
                    });
                }
                CommandAction::Move {
                    dx: payload.dx,
                    dy: payload.dy,
                }
            }
            CommandKind::Attack => {
                let payload = if wire.data.is_null() {
                    AttackPayload::default()
                } else {
                    serde_json::from_value::<AttackPayload>(wire.data)
                        .map_err(|e| invalid_payload(kind, e))?
                };
                let target_id = payload.target_id.filter(|t| !t.is_empty());
                if target_id.as_deref() == Some(wire.character_id.as_str()) {
                    return Err(ValidationError::SelfTarget(wire.character_id));
                }
                CommandAction::Attack { target_id }
            }
        };

        Ok(Command {
            character_id: wire.character_id,
            action,
        })
    }
}

fn invalid_payload(kind: CommandKind, err: serde_json::Error) -> ValidationError {
    ValidationError::InvalidPayload {
        kind: kind.as_str(),
        reason: err.to_string(),
    }
}

/// What a successfully applied command did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Spawned,
    Moved { distance: f32 },
    Attacked { hits: Vec<Hit> },
    Disconnected { removed: bool },
}

pub struct CommandPipeline {
    event_log: Arc<dyn EventLog>,
}

impl CommandPipeline {
    pub fn new(event_log: Arc<dyn EventLog>) -> Self {
        Self { event_log }
    }

    pub fn event_log(&self) -> &Arc<dyn EventLog> {
        &self.event_log
    }

    /// Routes a validated command to its handler. Callers hold the world lock
    /// for the whole call.
    pub fn execute(&self, world: &mut World, command: &Command) -> Result<Outcome, CommandError> {
        let id = command.character_id.as_str();
        match &command.action {
            CommandAction::Spawn => self.handle_spawn(world, id),
            CommandAction::Move { dx, dy } => self.handle_move(world, id, *dx, *dy),
            CommandAction::Attack { target_id } => {
                self.handle_attack(world, id, target_id.as_deref())
            }
            CommandAction::Disconnect => Ok(self.handle_disconnect(world, id)),
        }
    }

    fn handle_spawn(&self, world: &mut World, id: &str) -> Result<Outcome, CommandError> {
        if !world.spawn_random_character(id) {
            return Err(CommandError::AlreadyExists(id.to_string()));
        }
        self.event_log.log_event(&format!("Character {} spawned", id));
        Ok(Outcome::Spawned)
    }

    fn handle_move(
        &self,
        world: &mut World,
        id: &str,
        dx: f32,
        dy: f32,
    ) -> Result<Outcome, CommandError> {
        let (from_x, from_y) = resolve_living(world, id)?;
        let (width, height) = world.bounds();
        let (to_x, to_y) = world.clamp_point(from_x + dx, from_y + dy);

        let character = world
            .get_mut(id)
            .ok_or_else(|| CommandError::NotFound(id.to_string()))?;
        character.move_step(to_x - from_x, to_y - from_y);
        character.clamp_to(width, height);

        let (x, y) = character.position();
        let moved = distance(from_x, from_y, x, y);
        if moved > 0.0 {
            self.event_log
                .log_event(&format!("{} moved (distance: {:.2})", id, moved));
        }
        debug!("{} moved to ({:.2}, {:.2})", id, x, y);
        Ok(Outcome::Moved { distance: moved })
    }

    fn handle_attack(
        &self,
        world: &mut World,
        id: &str,
        target_id: Option<&str>,
    ) -> Result<Outcome, CommandError> {
        let (x, y) = resolve_living(world, id)?;
        let (class, radius) = match world.get(id) {
            Some(attacker) => (attacker.class(), attacker.attack_radius()),
            None => return Err(CommandError::NotFound(id.to_string())),
        };

        let hits = match class {
            CharacterClass::Warrior => {
                let hits = world.strike_area(id);
                self.event_log
                    .log_event(&format!("Warrior {} did an AoE melee attack", id));
                hits
            }
            CharacterClass::Mage => {
                let target_id = target_id.ok_or(ValidationError::MissingTarget)?;
                let target = world
                    .get(target_id)
                    .filter(|t| !t.is_dead())
                    .ok_or_else(|| CommandError::TargetUnavailable(target_id.to_string()))?;
                let (tx, ty) = target.position();
                let gap = distance(x, y, tx, ty);
                if gap > radius {
                    return Err(CommandError::OutOfRange {
                        target: target_id.to_string(),
                        distance: gap,
                        radius,
                    });
                }

                let hits = world.strike_target(id, target_id);
                self.event_log
                    .log_event(&format!("Mage {} attacked {} with magic", id, target_id));
                hits
            }
        };

        for hit in hits.iter().filter(|h| h.killed) {
            debug!("{} killed {}", id, hit.target_id);
        }
        Ok(Outcome::Attacked { hits })
    }

    fn handle_disconnect(&self, world: &mut World, id: &str) -> Outcome {
        let removed = world.remove(id).is_some();
        if removed {
            self.event_log.log_event(&format!("{} disconnected", id));
        }
        Outcome::Disconnected { removed }
    }
}

fn resolve_living(world: &World, id: &str) -> Result<(f32, f32), CommandError> {
    match world.get(id) {
        None => Err(CommandError::NotFound(id.to_string())),
        Some(c) if c.is_dead() => Err(CommandError::Dead(id.to_string())),
        Some(c) => Ok(c.position()),
    }
}
