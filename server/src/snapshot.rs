use crate::entity::Character;
use crate::world::World;
use shared::{CharacterSnapshot, Snapshot};

impl From<&Character> for CharacterSnapshot {
    fn from(character: &Character) -> Self {
        let (x, y) = character.position();
        CharacterSnapshot {
            id: character.id().to_string(),
            class: character.class(),
            state: character.state(),
            health: character.health(),
            x,
            y,
            flash: character.is_flashing(),
        }
    }
}

/// Copies the current world into a read-only view, ordered by id.
/// Dying characters are included so observers can see the death.
pub fn build_snapshot(world: &World) -> Snapshot {
    let mut characters: Vec<CharacterSnapshot> = world.iter().map(CharacterSnapshot::from).collect();
    characters.sort_by(|a, b| a.id.cmp(&b.id));
    Snapshot { characters }
}
