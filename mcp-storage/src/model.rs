//! Persistent record shapes owned by the relational store (spec §3).

use chrono::{DateTime, Utc};
use mcp_core::{MemoryId, ProjectId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub project_id: ProjectId,
    pub name: String,
    pub description: String,
    pub owner: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(project_id: ProjectId, name: impl Into<String>, owner: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            project_id,
            name: name.into(),
            description: String::new(),
            owner: owner.into(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A project-scoped note, TODO, or design decision. The three kinds
/// share shape; `kind` distinguishes them for storage and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectContextItem {
    pub project_id: ProjectId,
    pub kind: ContextItemKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContextItemKind {
    Note,
    Todo,
    Decision,
    Session,
}

/// A durable long-tier memory row (spec §3 "Memory Record", long tier).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LongMemoryRow {
    pub memory_id: MemoryId,
    pub project_id: ProjectId,
    pub content: String,
    pub category: String,
    pub importance: f64,
    pub tags: HashSet<String>,
    pub creator: String,
    pub created_at: DateTime<Utc>,
}
