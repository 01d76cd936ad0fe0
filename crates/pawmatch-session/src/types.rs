//! Session types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which side of the marketplace a user is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Adopter,
    Shelter,
}

impl UserRole {
    /// Cache namespace holding this role's profile images
    pub fn image_namespace(&self) -> &'static str {
        match self {
            UserRole::Adopter => "adopter_images",
            UserRole::Shelter => "shelter_images",
        }
    }
}

/// A signed-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub role: UserRole,
    pub display_name: Option<String>,
    pub started_at: DateTime<Utc>,
}
