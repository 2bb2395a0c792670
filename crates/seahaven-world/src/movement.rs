//! Protagonist movement: the discrete location state plus the cosmetic
//! position animation.
//!
//! [`MovementState::move_to`] switches `current_location` at once, which is
//! the value every other component reads. It also starts a new
//! [`Interpolation`] from wherever the animation currently is (never from
//! the previous target) and bumps a generation counter. A driver stepping an
//! older interpolation sees the bumped generation and stops, so a newer move
//! always supersedes an in-flight one.

use std::collections::BTreeMap;

use seahaven_types::{Location, Position};

use crate::error::WorldError;

/// The fixed set of named locations.
#[derive(Debug, Clone, Default)]
pub struct LocationMap {
    /// Locations keyed by lowercase name.
    locations: BTreeMap<String, Location>,
}

impl LocationMap {
    /// Create an empty map.
    pub const fn new() -> Self {
        Self {
            locations: BTreeMap::new(),
        }
    }

    /// Build a map from a list of locations.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateLocation`] if two locations share a name.
    pub fn from_locations(locations: impl IntoIterator<Item = Location>) -> Result<Self, WorldError> {
        let mut map = Self::new();
        for location in locations {
            map.add(location)?;
        }
        Ok(map)
    }

    /// Add a location. Its name is stored lowercase.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateLocation`] if the name is taken.
    pub fn add(&mut self, mut location: Location) -> Result<(), WorldError> {
        location.name = location.name.to_lowercase();
        if self.locations.contains_key(&location.name) {
            return Err(WorldError::DuplicateLocation(location.name));
        }
        self.locations.insert(location.name.clone(), location);
        Ok(())
    }

    /// Look up a location by exact (lowercase) name.
    pub fn get(&self, name: &str) -> Option<&Location> {
        self.locations.get(name)
    }

    /// Resolve a free-form token (e.g. `" Cafe."`) to a known location.
    pub fn resolve(&self, token: &str) -> Option<&Location> {
        let normalized = token
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        self.locations.get(&normalized)
    }

    /// Location names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.locations.keys().cloned().collect()
    }

    /// Number of locations.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether the map has no locations.
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// Linear interpolation from one position to another over a fixed number
/// of equal steps. The last step lands exactly on the target.
#[derive(Debug, Clone)]
pub struct Interpolation {
    /// Where the animation started.
    from: Position,
    /// Where it ends.
    to: Position,
    /// Total step count (at least 1).
    steps: u32,
    /// Steps already taken.
    taken: u32,
}

impl Interpolation {
    /// Plan an interpolation.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::ZeroSteps`] if `steps` is zero.
    pub const fn new(from: Position, to: Position, steps: u32) -> Result<Self, WorldError> {
        if steps == 0 {
            return Err(WorldError::ZeroSteps);
        }
        Ok(Self {
            from,
            to,
            steps,
            taken: 0,
        })
    }

    /// Target position.
    pub const fn target(&self) -> Position {
        self.to
    }

    /// Whether every step has been taken.
    pub const fn is_finished(&self) -> bool {
        self.taken >= self.steps
    }

    /// Steps left.
    pub const fn remaining(&self) -> u32 {
        self.steps.saturating_sub(self.taken)
    }

    /// Position after `taken` steps.
    fn position_at(&self, taken: u32) -> Position {
        if taken >= self.steps {
            return self.to;
        }
        let t = f64::from(taken) / f64::from(self.steps);
        Position::new(
            (self.to.x - self.from.x).mul_add(t, self.from.x),
            (self.to.y - self.from.y).mul_add(t, self.from.y),
        )
    }
}

impl Iterator for Interpolation {
    type Item = Position;

    fn next(&mut self) -> Option<Position> {
        if self.is_finished() {
            return None;
        }
        self.taken = self.taken.saturating_add(1);
        Some(self.position_at(self.taken))
    }
}

/// Result of a [`MovementState::move_to`] call.
#[derive(Debug, Clone)]
pub struct MoveStarted {
    /// The location moved to.
    pub location: Location,
    /// Location left behind.
    pub previous_location: String,
    /// Generation tag identifying this animation.
    pub generation: u64,
    /// The animation to drive.
    pub interpolation: Interpolation,
}

/// The protagonist's movement state machine.
#[derive(Debug, Clone)]
pub struct MovementState {
    /// Fixed set of locations.
    map: LocationMap,
    /// Authoritative location name.
    current_location: String,
    /// Cosmetic interpolated position.
    position: Position,
    /// Bumped by every move; animations tagged with an older value stop.
    generation: u64,
    /// Step count for new animations.
    steps: u32,
}

impl MovementState {
    /// Place the protagonist at `start`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownLocation`] if `start` is not on the map,
    /// or [`WorldError::ZeroSteps`] if `steps` is zero.
    pub fn new(map: LocationMap, start: &str, steps: u32) -> Result<Self, WorldError> {
        if steps == 0 {
            return Err(WorldError::ZeroSteps);
        }
        let location = map
            .resolve(start)
            .ok_or_else(|| WorldError::UnknownLocation(start.to_owned()))?;
        let current_location = location.name.clone();
        let position = location.position;
        Ok(Self {
            map,
            current_location,
            position,
            generation: 0,
            steps,
        })
    }

    /// The location map.
    pub const fn map(&self) -> &LocationMap {
        &self.map
    }

    /// Authoritative current location name.
    pub fn current_location(&self) -> &str {
        &self.current_location
    }

    /// Interpolated position.
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Current animation generation.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Switch location immediately and plan the animation from the current
    /// interpolated position. Any older animation is superseded.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownLocation`] if `token` names no location.
    pub fn move_to(&mut self, token: &str) -> Result<MoveStarted, WorldError> {
        let location = self
            .map
            .resolve(token)
            .cloned()
            .ok_or_else(|| WorldError::UnknownLocation(token.to_owned()))?;
        let interpolation = Interpolation::new(self.position, location.position, self.steps)?;
        let previous_location =
            std::mem::replace(&mut self.current_location, location.name.clone());
        self.generation = self.generation.wrapping_add(1);
        Ok(MoveStarted {
            location,
            previous_location,
            generation: self.generation,
            interpolation,
        })
    }

    /// Apply one animation step if `generation` is still current.
    ///
    /// Returns `false` when the animation has been superseded and the
    /// driver should stop.
    pub fn apply_step(&mut self, generation: u64, position: Position) -> bool {
        if generation != self.generation {
            return false;
        }
        self.position = position;
        true
    }

    /// Jump straight to the end of the current animation.
    pub fn settle(&mut self) {
        if let Some(location) = self.map.get(&self.current_location) {
            self.position = location.position;
        }
    }
}
