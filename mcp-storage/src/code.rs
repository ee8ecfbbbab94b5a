//! Source-code graph storage and the optional analyzer contract (spec
//! §4.B / §6 "Source-code analyzer (optional)"). The core only stores
//! and queries the graph; parsing a repository into entities and
//! relations is behind the [`CodeAnalyzer`] trait so a real
//! tree-sitter/LSP-backed implementation can be swapped in without
//! touching the tool layer.

use crate::error::Result;
use async_trait::async_trait;
use mcp_core::ProjectId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Module,
    Function,
    Type,
    Trait,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeEntity {
    pub project_id: ProjectId,
    pub entity_id: String,
    pub kind: EntityKind,
    pub name: String,
    pub file_path: String,
    pub line: u32,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Calls,
    Implements,
    DependsOn,
    DefinedIn,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeRelation {
    pub project_id: ProjectId,
    pub from_entity_id: String,
    pub to_entity_id: String,
    pub kind: RelationKind,
}

/// Parses source text into entities and relations. A real
/// implementation would shell out to tree-sitter grammars per
/// language; [`NoopCodeAnalyzer`] is the offline default and simply
/// reports that it found nothing, matching the spec's framing of the
/// analyzer as optional.
#[async_trait]
pub trait CodeAnalyzer: Send + Sync {
    async fn analyze_file(
        &self,
        project_id: &ProjectId,
        file_path: &str,
        source: &str,
    ) -> Result<(Vec<CodeEntity>, Vec<CodeRelation>)>;
}

#[derive(Default)]
pub struct NoopCodeAnalyzer;

impl NoopCodeAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CodeAnalyzer for NoopCodeAnalyzer {
    async fn analyze_file(
        &self,
        _project_id: &ProjectId,
        _file_path: &str,
        _source: &str,
    ) -> Result<(Vec<CodeEntity>, Vec<CodeRelation>)> {
        Ok((Vec::new(), Vec::new()))
    }
}

/// Persists and queries the code entity/relation graph a project's
/// analyzer run has produced.
#[async_trait]
pub trait CodeGraphStore: Send + Sync {
    async fn upsert_entities(&self, entities: Vec<CodeEntity>) -> Result<()>;

    async fn upsert_relations(&self, relations: Vec<CodeRelation>) -> Result<()>;

    async fn find_entity(&self, project_id: &ProjectId, name: &str) -> Result<Vec<CodeEntity>>;

    async fn list_entities(&self, project_id: &ProjectId, kind: Option<EntityKind>) -> Result<Vec<CodeEntity>>;

    /// Entities directly related to `entity_id`, regardless of
    /// direction, optionally filtered to one relation kind.
    async fn neighbors(
        &self,
        project_id: &ProjectId,
        entity_id: &str,
        kind: Option<RelationKind>,
    ) -> Result<Vec<CodeEntity>>;
}

#[derive(Default)]
pub struct InMemoryCodeGraphStore {
    entities: RwLock<HashMap<ProjectId, Vec<CodeEntity>>>,
    relations: RwLock<HashMap<ProjectId, Vec<CodeRelation>>>,
}

impl InMemoryCodeGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CodeGraphStore for InMemoryCodeGraphStore {
    async fn upsert_entities(&self, entities: Vec<CodeEntity>) -> Result<()> {
        let mut by_project = self.entities.write();
        for entity in entities {
            let bucket = by_project.entry(entity.project_id.clone()).or_default();
            if let Some(existing) = bucket.iter_mut().find(|e| e.entity_id == entity.entity_id) {
                *existing = entity;
            } else {
                bucket.push(entity);
            }
        }
        Ok(())
    }

    async fn upsert_relations(&self, relations: Vec<CodeRelation>) -> Result<()> {
        let mut by_project = self.relations.write();
        for relation in relations {
            let bucket = by_project.entry(relation.project_id.clone()).or_default();
            let dup = bucket.iter().any(|r| {
                r.from_entity_id == relation.from_entity_id
                    && r.to_entity_id == relation.to_entity_id
                    && r.kind == relation.kind
            });
            if !dup {
                bucket.push(relation);
            }
        }
        Ok(())
    }

    async fn find_entity(&self, project_id: &ProjectId, name: &str) -> Result<Vec<CodeEntity>> {
        Ok(self
            .entities
            .read()
            .get(project_id)
            .map(|bucket| bucket.iter().filter(|e| e.name == name).cloned().collect())
            .unwrap_or_default())
    }

    async fn list_entities(&self, project_id: &ProjectId, kind: Option<EntityKind>) -> Result<Vec<CodeEntity>> {
        Ok(self
            .entities
            .read()
            .get(project_id)
            .map(|bucket| {
                bucket
                    .iter()
                    .filter(|e| kind.map(|k| k == e.kind).unwrap_or(true))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn neighbors(
        &self,
        project_id: &ProjectId,
        entity_id: &str,
        kind: Option<RelationKind>,
    ) -> Result<Vec<CodeEntity>> {
        let relations = self.relations.read();
        let Some(bucket) = relations.get(project_id) else {
            return Ok(Vec::new());
        };
        let neighbor_ids: Vec<&str> = bucket
            .iter()
            .filter(|r| kind.map(|k| k == r.kind).unwrap_or(true))
            .filter_map(|r| {
                if r.from_entity_id == entity_id {
                    Some(r.to_entity_id.as_str())
                } else if r.to_entity_id == entity_id {
                    Some(r.from_entity_id.as_str())
                } else {
                    None
                }
            })
            .collect();
        let entities = self.entities.read();
        Ok(entities
            .get(project_id)
            .map(|es| es.iter().filter(|e| neighbor_ids.contains(&e.entity_id.as_str())).cloned().collect())
            .unwrap_or_default())
    }
}

pub type SharedCodeAnalyzer = Arc<dyn CodeAnalyzer>;
pub type SharedCodeGraphStore = Arc<dyn CodeGraphStore>;

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(project: &ProjectId, id: &str, kind: EntityKind, name: &str) -> CodeEntity {
        CodeEntity {
            project_id: project.clone(),
            entity_id: id.to_string(),
            kind,
            name: name.to_string(),
            file_path: "src/lib.rs".to_string(),
            line: 1,
            signature: None,
        }
    }

    #[tokio::test]
    async fn upsert_then_find_by_name() {
        let store = InMemoryCodeGraphStore::new();
        let project = ProjectId::from("p1".to_string());
        store.upsert_entities(vec![entity(&project, "e1", EntityKind::Function, "retrieve")]).await.unwrap();
        let found = store.find_entity(&project, "retrieve").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].entity_id, "e1");
    }

    #[tokio::test]
    async fn upsert_is_idempotent_on_entity_id() {
        let store = InMemoryCodeGraphStore::new();
        let project = ProjectId::from("p1".to_string());
        store.upsert_entities(vec![entity(&project, "e1", EntityKind::Function, "retrieve")]).await.unwrap();
        let mut updated = entity(&project, "e1", EntityKind::Function, "retrieve");
        updated.line = 42;
        store.upsert_entities(vec![updated]).await.unwrap();
        let all = store.list_entities(&project, None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].line, 42);
    }

    #[tokio::test]
    async fn neighbors_follow_relations_in_either_direction() {
        let store = InMemoryCodeGraphStore::new();
        let project = ProjectId::from("p1".to_string());
        store
            .upsert_entities(vec![
                entity(&project, "caller", EntityKind::Function, "a"),
                entity(&project, "callee", EntityKind::Function, "b"),
            ])
            .await
            .unwrap();
        store
            .upsert_relations(vec![CodeRelation {
                project_id: project.clone(),
                from_entity_id: "caller".to_string(),
                to_entity_id: "callee".to_string(),
                kind: RelationKind::Calls,
            }])
            .await
            .unwrap();
        let neighbors = store.neighbors(&project, "callee", None).await.unwrap();
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].entity_id, "caller");
    }

    #[tokio::test]
    async fn noop_analyzer_finds_nothing() {
        let analyzer = NoopCodeAnalyzer::new();
        let project = ProjectId::from("p1".to_string());
        let (entities, relations) = analyzer.analyze_file(&project, "src/lib.rs", "fn main() {}").await.unwrap();
        assert!(entities.is_empty());
        assert!(relations.is_empty());
    }
}
