//! Authoritative world state: the character registry and its bounds.

use crate::entity::{world_scale, Character, Hit};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{CharacterClass, TICK_DT};
use std::collections::HashMap;

pub struct World {
    characters: HashMap<String, Character>,
    width: f32,
    height: f32,
    rng: StdRng,
    tick: u64,
}

impl World {
    pub fn new(width: f32, height: f32, rng: StdRng) -> Self {
        Self {
            characters: HashMap::new(),
            width,
            height,
            rng,
            tick: 0,
        }
    }

    pub fn with_seed(width: f32, height: f32, seed: u64) -> Self {
        Self::new(width, height, StdRng::seed_from_u64(seed))
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Number of simulation ticks applied so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn scale(&self) -> f32 {
        world_scale(self.width, self.height)
    }

    /// Spawns a character with a random class at a random position.
    /// Returns false and leaves the world untouched if the id is taken.
    pub fn spawn_random_character(&mut self, id: &str) -> bool {
        if self.characters.contains_key(id) {
            return false;
        }

        let character = self.random_character(id);
        info!(
            "Spawned {} {} at ({:.1}, {:.1})",
            character.class().as_str(),
            id,
            character.position().0,
            character.position().1
        );
        self.characters.insert(id.to_string(), character);
        true
    }

    fn random_character(&mut self, id: &str) -> Character {
        let x = self.rng.gen_range(0.0..=self.width);
        let y = self.rng.gen_range(0.0..=self.height);
        let class = if self.rng.gen_bool(0.5) {
            CharacterClass::Warrior
        } else {
            CharacterClass::Mage
        };
        Character::new(id, class, x, y, self.scale())
    }

    /// Places a specific character, replacing any previous one with the same id.
    pub fn insert(&mut self, character: Character) -> Option<Character> {
        self.characters.insert(character.id().to_string(), character)
    }

    pub fn get(&self, id: &str) -> Option<&Character> {
        self.characters.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Character> {
        self.characters.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.characters.contains_key(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Character> {
        self.characters.remove(id)
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    pub fn bounds(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    /// Ids of living characters within `radius` of `center`, excluding `exclude`.
    pub fn entities_within(&self, center: (f32, f32), radius: f32, exclude: &str) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .characters
            .values()
            .filter(|c| c.id() != exclude && !c.is_dead())
            .filter(|c| {
                let (x, y) = c.position();
                shared::distance(center.0, center.1, x, y) <= radius
            })
            .map(|c| c.id())
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn clamp_point(&self, x: f32, y: f32) -> (f32, f32) {
        (x.clamp(0.0, self.width), y.clamp(0.0, self.height))
    }

    /// Advances every character by one fixed logical tick.
    pub fn update(&mut self) {
        self.tick += 1;
        for character in self.characters.values_mut() {
            character.update(TICK_DT);
        }
    }

    /// Replaces every dead character with a freshly spawned one under the
    /// same id and returns the ids that were replaced.
    pub fn respawn_dead(&mut self) -> Vec<String> {
        let mut dead: Vec<String> = self
            .characters
            .values()
            .filter(|c| c.is_dead())
            .map(|c| c.id().to_string())
            .collect();
        // Keeps RNG consumption independent of hash order.
        dead.sort();

        for id in &dead {
            let character = self.random_character(id);
            info!("Respawned {} as {}", id, character.class().as_str());
            self.characters.insert(id.clone(), character);
        }

        dead
    }

    /// Lets `attacker_id` strike every living character inside its attack
    /// radius. Hits come back ordered by target id.
    pub fn strike_area(&mut self, attacker_id: &str) -> Vec<Hit> {
        let targets: Vec<String> = match self.characters.get(attacker_id) {
            Some(attacker) => self
                .entities_within(attacker.position(), attacker.attack_radius(), attacker_id)
                .into_iter()
                .map(str::to_string)
                .collect(),
            None => return Vec::new(),
        };

        let mut hits = self
            .with_attacker(attacker_id, |attacker, others| {
                attacker.attack(
                    others
                        .values_mut()
                        .filter(|c| targets.iter().any(|t| t == c.id())),
                )
            })
            .unwrap_or_default();
        hits.sort_by(|a, b| a.target_id.cmp(&b.target_id));
        hits
    }

    pub fn strike_target(&mut self, attacker_id: &str, target_id: &str) -> Vec<Hit> {
        self.with_attacker(attacker_id, |attacker, others| {
            attacker.attack(others.get_mut(target_id))
        })
        .unwrap_or_default()
    }

    // The attacker is taken out of the map for the duration of the strike so
    // it can be borrowed mutably alongside its targets.
    fn with_attacker<R>(
        &mut self,
        attacker_id: &str,
        f: impl FnOnce(&mut Character, &mut HashMap<String, Character>) -> R,
    ) -> Option<R> {
        let mut attacker = self.characters.remove(attacker_id)?;
        let result = f(&mut attacker, &mut self.characters);
        self.characters.insert(attacker_id.to_string(), attacker);
        Some(result)
    }
}
