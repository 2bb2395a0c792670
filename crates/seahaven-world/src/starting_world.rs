//! Default starting world for the Seahaven simulation.
//!
//! The five-location town map, the two-member supporting cast, and the
//! protagonist's opening profile.

use seahaven_types::{Agent, Location, Position, Protagonist, WorldState};

use crate::error::WorldError;
use crate::movement::LocationMap;

/// Name of the location the protagonist wakes up in.
pub const START_LOCATION: &str = "home";

/// Helper to build a [`Location`].
fn loc(name: &str, label: &str, x: f64, y: f64) -> Location {
    Location {
        name: name.to_owned(),
        label: label.to_owned(),
        position: Position::new(x, y),
    }
}

/// Helper to build an [`Agent`].
fn agent(
    name: &str,
    role: &str,
    traits: &str,
    agenda: &str,
    mood: &str,
    activity: &str,
    trust_level: u8,
) -> Agent {
    Agent {
        name: name.to_owned(),
        role: role.to_owned(),
        personality_traits: traits.to_owned(),
        agenda: agenda.to_owned(),
        current_mood: mood.to_owned(),
        current_activity: activity.to_owned(),
        trust_level,
    }
}

/// The town's locations.
pub fn default_locations() -> Vec<Location> {
    vec![
        loc("home", "Truman's House", 50.0, 50.0),
        loc("work", "Insurance Office", 80.0, 30.0),
        loc("cafe", "Cafe", 30.0, 40.0),
        loc("store", "Store", 70.0, 70.0),
        loc("park", "Park", 20.0, 60.0),
    ]
}

/// The default town map.
///
/// # Errors
///
/// Never fails for the built-in locations; the `Result` mirrors
/// [`LocationMap::from_locations`].
pub fn default_map() -> Result<LocationMap, WorldError> {
    LocationMap::from_locations(default_locations())
}

/// The supporting cast.
pub fn default_agents() -> Vec<Agent> {
    vec![
        agent(
            "Meryl",
            "Wife",
            "Product placement specialist, anxious when off-script",
            "Must promote products naturally while maintaining relationship with Truman",
            "Anxious",
            "Preparing morning coffee",
            90,
        ),
        agent(
            "Marlon",
            "Best Friend",
            "Crisis manager, laid back but always watchful",
            "Keep Truman from discovering the truth while being a supportive friend",
            "Alert",
            "Watching neighborhood",
            95,
        ),
    ]
}

/// The protagonist at the start of a session.
pub fn default_protagonist(name: &str) -> Protagonist {
    Protagonist {
        name: name.to_owned(),
        current_mood: "Content".to_owned(),
        current_activity: "Waking up".to_owned(),
        current_location: START_LOCATION.to_owned(),
    }
}

/// Opening world state.
pub fn default_world_state() -> WorldState {
    WorldState {
        weather: "Sunny".to_owned(),
        time_of_day: "Morning".to_owned(),
        current_event: None,
        suspicion_meter: 20,
        viewer_count: "1.2M".to_owned(),
    }
}
