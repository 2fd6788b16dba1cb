//! Decision making for the scripted bot.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{distance, CharacterClass, CharacterSnapshot, CharacterState, Snapshot, WireCommand};

/// Distance at which the bot tries to attack. Generous on purpose: the server
/// checks real ranges and answers with an error when the target is too far.
pub const ENGAGE_DISTANCE: f32 = 20.0;
/// Length of a single requested move.
pub const STEP: f32 = 5.0;

pub struct Bot {
    id: String,
    rng: StdRng,
}

impl Bot {
    pub fn new(id: impl Into<String>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { id: id.into(), rng }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Picks the next command given the latest snapshot. Returns None while
    /// the bot's character is dying and waiting to respawn.
    pub fn next_command(&mut self, snapshot: &Snapshot) -> Option<WireCommand> {
        let Some(me) = snapshot.get(&self.id) else {
            return Some(WireCommand::spawn(&self.id));
        };
        if me.state == CharacterState::Dying {
            return None;
        }

        match nearest_enemy(snapshot, me) {
            Some((enemy, gap)) if gap <= ENGAGE_DISTANCE => Some(match me.class {
                CharacterClass::Warrior => WireCommand::attack(&self.id, None),
                CharacterClass::Mage => WireCommand::attack(&self.id, Some(enemy.id.as_str())),
            }),
            Some((enemy, gap)) => {
                let scale = STEP / gap;
                Some(WireCommand::move_by(
                    &self.id,
                    (enemy.x - me.x) * scale,
                    (enemy.y - me.y) * scale,
                ))
            }
            None => {
                let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
                Some(WireCommand::move_by(
                    &self.id,
                    angle.cos() * STEP,
                    angle.sin() * STEP,
                ))
            }
        }
    }
}

/// Closest living character other than `me`, with its distance.
pub fn nearest_enemy<'a>(
    snapshot: &'a Snapshot,
    me: &CharacterSnapshot,
) -> Option<(&'a CharacterSnapshot, f32)> {
    snapshot
        .characters
        .iter()
        .filter(|c| c.id != me.id && c.state != CharacterState::Dying)
        .map(|c| (c, distance(me.x, me.y, c.x, c.y)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use serde_json::Value;

    fn character(id: &str, class: CharacterClass, x: f32, y: f32) -> CharacterSnapshot {
        CharacterSnapshot {
            id: id.to_string(),
            class,
            state: CharacterState::Idle,
            health: 100.0,
            x,
            y,
            flash: false,
        }
    }

    #[test]
    fn test_spawns_when_absent() {
        let mut bot = Bot::new("bot", Some(1));
        let command = bot.next_command(&Snapshot::default()).unwrap();
        assert_eq!(command, WireCommand::spawn("bot"));
    }

    #[test]
    fn test_waits_while_dying() {
        let mut bot = Bot::new("bot", Some(1));
        let mut me = character("bot", CharacterClass::Mage, 0.0, 0.0);
        me.state = CharacterState::Dying;
        let snapshot = Snapshot {
            characters: vec![me],
        };
        assert!(bot.next_command(&snapshot).is_none());
    }

    #[test]
    fn test_mage_targets_nearest() {
        let mut bot = Bot::new("bot", Some(1));
        let snapshot = Snapshot {
            characters: vec![
                character("bot", CharacterClass::Mage, 10.0, 10.0),
                character("far", CharacterClass::Warrior, 25.0, 10.0),
                character("near", CharacterClass::Warrior, 12.0, 10.0),
            ],
        };
        let command = bot.next_command(&snapshot).unwrap();
        assert_eq!(command, WireCommand::attack("bot", Some("near")));
    }

    #[test]
    fn test_warrior_attacks_without_target() {
        let mut bot = Bot::new("bot", Some(1));
        let snapshot = Snapshot {
            characters: vec![
                character("bot", CharacterClass::Warrior, 10.0, 10.0),
                character("other", CharacterClass::Mage, 11.0, 10.0),
            ],
        };
        assert_eq!(
            bot.next_command(&snapshot).unwrap(),
            WireCommand::attack("bot", None)
        );
    }

    #[test]
    fn test_walks_toward_distant_enemy() {
        let mut bot = Bot::new("bot", Some(1));
        let snapshot = Snapshot {
            characters: vec![
                character("bot", CharacterClass::Warrior, 0.0, 0.0),
                character("other", CharacterClass::Mage, 60.0, 80.0),
            ],
        };
        let command = bot.next_command(&snapshot).unwrap();
        assert_eq!(command.kind, "MOVE");
        let dx = command.data["dx"].as_f64().unwrap();
        let dy = command.data["dy"].as_f64().unwrap();
        assert_approx_eq!(dx, 3.0, 1e-4);
        assert_approx_eq!(dy, 4.0, 1e-4);
    }

    #[test]
    fn test_wanders_when_alone() {
        let mut bot = Bot::new("bot", Some(1));
        let snapshot = Snapshot {
            characters: vec![character("bot", CharacterClass::Mage, 50.0, 50.0)],
        };
        let command = bot.next_command(&snapshot).unwrap();
        assert_eq!(command.kind, "MOVE");
        assert!(matches!(command.data["dx"], Value::Number(_)));
    }
}
