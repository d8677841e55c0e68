//! Profile document and its sub-records

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A user's profile, identified by a caller-chosen owner key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDocument {
    /// Opaque owner key, unique per document and never regenerated
    pub owner_key: String,

    #[serde(default)]
    pub basic_info: Vec<BasicInfo>,

    #[serde(default)]
    pub education: Vec<Education>,

    #[serde(default)]
    pub experience: Vec<Experience>,

    #[serde(default)]
    pub projects: Vec<Project>,

    #[serde(default)]
    pub skills: BTreeSet<String>,
}

impl ProfileDocument {
    /// Create an empty profile for an owner key
    pub fn new(owner_key: impl Into<String>) -> Self {
        Self {
            owner_key: owner_key.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Education {
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub major: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub degree: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experience {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub achievements: Vec<String>,
}

/// A project entry, also the shape produced by repository enrichment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
}
