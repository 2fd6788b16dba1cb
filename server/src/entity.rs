//! Characters living in the world and their combat/movement state machine.
//!
//! Both classes share one [`Character`] struct; class-specific numbers live in
//! a [`ClassProfile`] and class-specific behaviour is selected by matching on
//! [`CharacterClass`].

use shared::{distance, CharacterClass, CharacterState, DamageType, REFERENCE_WORLD_SIZE};

/// Seconds the hit flash stays visible after taking damage.
pub const FLASH_DURATION: f32 = 0.2;
/// Seconds a character stays in the attacking state after an attack.
pub const ATTACK_HOLD: f32 = 0.3;
/// Seconds without movement before running falls back to idle.
pub const RUN_GRACE: f32 = 0.2;
pub const MAGE_SLOW_AMOUNT: f32 = 0.5;
pub const MAGE_SLOW_DURATION: f32 = 3.0;

/// Class constants, already scaled to the world the character lives in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassProfile {
    pub max_health: f32,
    pub attack_power: f32,
    pub attack_radius: f32,
    pub base_speed: f32,
    pub damage_type: DamageType,
    /// Fraction of incoming damage of `damage_type` that is absorbed.
    pub resistance: f32,
}

impl ClassProfile {
    /// Radius and speed are tuned for a 100x100 map and grow linearly with
    /// the shorter side of the world.
    pub fn for_class(class: CharacterClass, scale: f32) -> Self {
        match class {
            CharacterClass::Warrior => Self {
                max_health: 100.0,
                attack_power: 20.0,
                attack_radius: 5.0 * scale,
                base_speed: 1.0 * scale,
                damage_type: DamageType::Physical,
                resistance: 0.5,
            },
            CharacterClass::Mage => Self {
                max_health: 80.0,
                attack_power: 30.0,
                attack_radius: 20.0 * scale,
                base_speed: 1.2 * scale,
                damage_type: DamageType::Magical,
                resistance: 0.3,
            },
        }
    }
}

/// Scale factor applied to class radii and speeds for a world of this size.
pub fn world_scale(width: f32, height: f32) -> f32 {
    let side = width.min(height);
    if side.is_finite() && side > 0.0 {
        side / REFERENCE_WORLD_SIZE
    } else {
        1.0
    }
}

/// Result of one attack landing on one target.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub target_id: String,
    pub damage: f32,
    pub killed: bool,
}

#[derive(Debug, Clone)]
pub struct Character {
    id: String,
    class: CharacterClass,
    profile: ClassProfile,
    x: f32,
    y: f32,
    health: f32,
    dead: bool,
    state: CharacterState,
    slow_amount: f32,
    slow_timer: f32,
    flash_timer: f32,
    attack_timer: f32,
    since_move: f32,
}

impl Character {
    pub fn new(id: impl Into<String>, class: CharacterClass, x: f32, y: f32, scale: f32) -> Self {
        let profile = ClassProfile::for_class(class, scale);
        Self {
            id: id.into(),
            class,
            profile,
            x,
            y,
            health: profile.max_health,
            dead: false,
            state: CharacterState::Idle,
            slow_amount: 0.0,
            slow_timer: 0.0,
            flash_timer: 0.0,
            attack_timer: 0.0,
            since_move: 0.0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn class(&self) -> CharacterClass {
        self.class
    }

    pub fn profile(&self) -> &ClassProfile {
        &self.profile
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    pub fn max_health(&self) -> f32 {
        self.profile.max_health
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn state(&self) -> CharacterState {
        self.state
    }

    pub fn damage_type(&self) -> DamageType {
        self.profile.damage_type
    }

    pub fn attack_power(&self) -> f32 {
        self.profile.attack_power
    }

    pub fn attack_radius(&self) -> f32 {
        self.profile.attack_radius
    }

    pub fn is_flashing(&self) -> bool {
        self.flash_timer > 0.0
    }

    pub fn is_slowed(&self) -> bool {
        self.slow_timer > 0.0
    }

    /// Current movement speed with any active slow applied.
    pub fn speed(&self) -> f32 {
        if self.is_slowed() {
            self.profile.base_speed * (1.0 - self.slow_amount)
        } else {
            self.profile.base_speed
        }
    }

    pub fn distance_to(&self, other: &Character) -> f32 {
        distance(self.x, self.y, other.x, other.y)
    }

    /// Takes one step of `speed()` length in the direction of `(dx, dy)`.
    pub fn move_step(&mut self, dx: f32, dy: f32) {
        if self.dead || self.state == CharacterState::Dying {
            return;
        }

        let length = dx.hypot(dy);
        if !length.is_finite() || length <= f32::EPSILON {
            return;
        }

        let speed = self.speed();
        self.x += dx / length * speed;
        self.y += dy / length * speed;
        self.state = CharacterState::Running;
        self.since_move = 0.0;
    }

    pub fn clamp_to(&mut self, width: f32, height: f32) {
        self.x = self.x.clamp(0.0, width);
        self.y = self.y.clamp(0.0, height);
    }

    /// Applies damage after class resistance and returns the amount dealt.
    pub fn take_damage(&mut self, amount: f32, damage_type: DamageType) -> f32 {
        if self.dead || self.state == CharacterState::Dying {
            return 0.0;
        }

        let dealt = if damage_type == self.profile.damage_type {
            amount * (1.0 - self.profile.resistance)
        } else {
            amount
        };

        self.health = (self.health - dealt).max(0.0);
        self.flash_timer = FLASH_DURATION;

        if self.health <= 0.0 {
            self.dead = true;
            self.state = CharacterState::Dying;
            self.slow_timer = 0.0;
            self.slow_amount = 0.0;
        }

        dealt
    }

    pub fn apply_slow(&mut self, amount: f32, duration: f32) {
        if self.dead {
            return;
        }
        self.slow_amount = amount.clamp(0.0, 1.0);
        self.slow_timer = duration.max(0.0);
    }

    /// Strikes every eligible target. Warriors hit all living targets within
    /// radius; mages hit the first one and slow it.
    pub fn attack<'a, I>(&mut self, targets: I) -> Vec<Hit>
    where
        I: IntoIterator<Item = &'a mut Character>,
    {
        if self.dead || self.state == CharacterState::Dying {
            return Vec::new();
        }

        let mut hits = Vec::new();
        for target in targets {
            if target.id == self.id || target.is_dead() {
                continue;
            }
            if self.distance_to(target) > self.profile.attack_radius {
                continue;
            }

            let damage = target.take_damage(self.profile.attack_power, self.profile.damage_type);
            hits.push(Hit {
                target_id: target.id.clone(),
                damage,
                killed: target.is_dead(),
            });

            match self.class {
                CharacterClass::Warrior => {}
                CharacterClass::Mage => {
                    target.apply_slow(MAGE_SLOW_AMOUNT, MAGE_SLOW_DURATION);
                    break;
                }
            }
        }

        self.state = CharacterState::Attacking;
        self.attack_timer = ATTACK_HOLD;
        hits
    }

    /// Advances timed effects by `dt` logical seconds.
    pub fn update(&mut self, dt: f32) {
        if self.flash_timer > 0.0 {
            self.flash_timer = (self.flash_timer - dt).max(0.0);
        }

        if self.slow_timer > 0.0 {
            self.slow_timer -= dt;
            if self.slow_timer <= 0.0 {
                self.slow_timer = 0.0;
                self.slow_amount = 0.0;
            }
        }

        if self.dead {
            return;
        }

        if self.attack_timer > 0.0 {
            self.attack_timer -= dt;
            if self.attack_timer <= 0.0 {
                self.attack_timer = 0.0;
                if self.state == CharacterState::Attacking {
                    self.state = CharacterState::Idle;
                }
            }
        }

        self.since_move += dt;
        if self.state == CharacterState::Running && self.since_move >= RUN_GRACE {
            self.state = CharacterState::Idle;
        }
    }
}
