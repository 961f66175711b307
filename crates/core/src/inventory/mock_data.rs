//! Demo inventory used to seed development backends.
//!
//! Pure functions only. Ids are left at `0` so the repository assigns them in
//! insertion order.

use super::types::{ConditionType, Personnel, Project, StatusType, Tool};

const TOOL_NAMES: [&str; 12] = [
    "Hammer",
    "Circular Saw",
    "Cordless Drill",
    "Angle Grinder",
    "Laser Level",
    "Pipe Wrench",
    "Ladder 8ft",
    "Shop Vacuum",
    "Impact Driver",
    "Tape Measure",
    "Wheelbarrow",
    "Jackhammer",
];

/// Returns the standard condition lookup values.
pub fn seed_condition_types() -> Vec<ConditionType> {
    ["New", "Good", "Worn", "Damaged"]
        .into_iter()
        .map(ConditionType::new)
        .collect()
}

/// Returns the standard status lookup values.
pub fn seed_status_types() -> Vec<StatusType> {
    ["Available", "Checked Out", "In Repair", "Retired"]
        .into_iter()
        .map(StatusType::new)
        .collect()
}

/// Returns `count` tools cycling through a fixed catalogue.
///
/// Quantities are deterministic so tests and demos can assert on them.
///
/// # Example
///
/// ```
/// use toolcheck_core::inventory::seed_tools;
///
/// let tools = seed_tools(3);
/// assert_eq!(tools.len(), 3);
/// assert_eq!(tools[0].name, "Hammer");
/// ```
pub fn seed_tools(count: usize) -> Vec<Tool> {
    (0..count)
        .map(|i| {
            let base = TOOL_NAMES[i % TOOL_NAMES.len()];
            let name = if i < TOOL_NAMES.len() {
                base.to_string()
            } else {
                format!("{} #{}", base, i / TOOL_NAMES.len() + 1)
            };
            Tool::new(name, (i % 5) as i32 + 1)
                .with_condition(1 + (i % 2) as i64)
                .with_status(1)
        })
        .collect()
}

/// Returns a handful of active projects.
pub fn seed_projects() -> Vec<Project> {
    vec![
        Project::new("Riverside Renovation").with_location("12 Quay Street"),
        Project::new("Hillcrest School Annex").with_location("Hillcrest Rd"),
        Project::new("Depot Maintenance"),
    ]
}

/// Returns a handful of crew members.
pub fn seed_personnel() -> Vec<Personnel> {
    vec![
        Personnel::new("Ana", "Pereira").with_position("Foreman"),
        Personnel::new("Luis", "Garcia").with_position("Carpenter"),
        Personnel::new("Sam", "Okafor").with_position("Electrician"),
    ]
}
