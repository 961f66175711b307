mod entity;
mod mock_data;
mod types;

pub use entity::{Entity, ValidationError};
pub use mock_data::{
    seed_condition_types, seed_personnel, seed_projects, seed_status_types, seed_tools,
};
pub use types::{
    Checkin, ConditionType, Image, Personnel, Project, StatusType, Tool, ToolRepairRequest,
    ToolRequest, User,
};
