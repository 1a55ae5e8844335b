//! Adapts the backend's schema surface to row-shaped results (spec §4.K).

use crate::context::QueryPlanContext;
use crate::events::QueryEvent;
use async_trait::async_trait;
use meshbatch_core::client::ClientError;
use meshbatch_core::value::{QueryRow, QueryValue};
use std::collections::HashSet;
use std::time::Instant;

/// One of the six virtual-table shapes the metadata executor can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataTable {
    Entity,
    Attribute,
    RelationshipOneToMany,
    RelationshipManyToMany,
    OptionSet,
    OptionSetValue,
}

#[derive(Debug, Clone)]
pub struct EntityMetadata {
    pub logical_name: String,
    pub display_name: String,
}

#[derive(Debug, Clone)]
pub struct AttributeMetadata {
    pub schema_name: String,
    pub entity_logical_name: String,
    pub data_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipKind {
    OneToMany,
    ManyToMany,
}

#[derive(Debug, Clone)]
pub struct RelationshipMetadata {
    pub schema_name: String,
    pub kind: RelationshipKind,
    pub referencing_entity: String,
    pub referenced_entity: String,
}

#[derive(Debug, Clone)]
pub struct OptionSetValueMetadata {
    pub value: i64,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct OptionSetMetadata {
    pub schema_name: String,
    pub values: Vec<OptionSetValueMetadata>,
}

/// The backend's schema surface, adapted to plain metadata structs. A test double may
/// implement this without network I/O, same as [`meshbatch_core::client::BackendClient`].
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn list_entities(&self) -> Result<Vec<EntityMetadata>, ClientError>;
    async fn list_attributes(&self, entity: &str) -> Result<Vec<AttributeMetadata>, ClientError>;
    async fn list_relationships(&self, entity: &str) -> Result<Vec<RelationshipMetadata>, ClientError>;
    async fn list_option_sets(&self) -> Result<Vec<OptionSetMetadata>, ClientError>;
}

/// Queries `table` from `source`, applying `requested_columns` as a projection (spec §4.H
/// `MetadataScan`, §4.K). `node_name` labels progress events.
pub async fn query_metadata_table(
    source: &dyn MetadataSource,
    table: MetadataTable,
    requested_columns: Option<&[String]>,
    node_name: &str,
    ctx: &QueryPlanContext,
) -> Result<Vec<QueryRow>, ClientError> {
    let rows = match table {
        MetadataTable::Entity => {
            source.list_entities().await?.into_iter().map(entity_row).collect()
        }
        MetadataTable::OptionSet => {
            let option_sets = source.list_option_sets().await?;
            option_sets.iter().map(option_set_row).collect()
        }
        MetadataTable::OptionSetValue => {
            let option_sets = source.list_option_sets().await?;
            option_sets
                .iter()
                .flat_map(|set| set.values.iter().map(move |value| option_set_value_row(set, value)))
                .collect()
        }
        MetadataTable::Attribute => {
            warn_o_entities(ctx, node_name, "attributes");
            let entities = source.list_entities().await?;
            let mut rows = Vec::new();
            for entity in &entities {
                for attribute in source.list_attributes(&entity.logical_name).await? {
                    rows.push(attribute_row(&attribute));
                }
            }
            rows
        }
        MetadataTable::RelationshipOneToMany | MetadataTable::RelationshipManyToMany => {
            warn_o_entities(ctx, node_name, "relationships");
            let wanted_kind = if table == MetadataTable::RelationshipOneToMany {
                RelationshipKind::OneToMany
            } else {
                RelationshipKind::ManyToMany
            };
            let entities = source.list_entities().await?;
            let mut seen = HashSet::new();
            let mut rows = Vec::new();
            for entity in &entities {
                for relationship in source.list_relationships(&entity.logical_name).await? {
                    if relationship.kind != wanted_kind {
                        continue;
                    }
                    let key = relationship.schema_name.to_ascii_lowercase();
                    if seen.insert(key) {
                        rows.push(relationship_row(&relationship));
                    }
                }
            }
            rows
        }
    };

    Ok(rows.into_iter().map(|row| project(row, requested_columns)).collect())
}

fn warn_o_entities(ctx: &QueryPlanContext, node_name: &str, table: &str) {
    ctx.progress.emit(&QueryEvent::Warning {
        node_name: node_name.to_string(),
        message: format!("metadata query for {table} is O(entities); this may be slow for large schemas"),
        timestamp: Instant::now(),
    });
}

fn project(row: QueryRow, requested_columns: Option<&[String]>) -> QueryRow {
    let Some(requested) = requested_columns else {
        return row;
    };
    let wanted: HashSet<String> = requested.iter().map(|c| c.to_ascii_lowercase()).collect();
    let columns = row
        .columns()
        .filter(|(name, _)| wanted.contains(&name.to_ascii_lowercase()))
        .map(|(name, value)| (name.to_string(), value.clone()));
    QueryRow::new(row.entity_logical_name().to_string(), columns)
}

fn entity_row(entity: EntityMetadata) -> QueryRow {
    QueryRow::new(
        "entity",
        vec![
            ("logicalname".to_string(), QueryValue::String(entity.logical_name)),
            ("displayname".to_string(), QueryValue::String(entity.display_name)),
        ],
    )
}

fn attribute_row(attribute: &AttributeMetadata) -> QueryRow {
    QueryRow::new(
        "attribute",
        vec![
            ("schemaname".to_string(), QueryValue::String(attribute.schema_name.clone())),
            ("entitylogicalname".to_string(), QueryValue::String(attribute.entity_logical_name.clone())),
            ("datatype".to_string(), QueryValue::String(attribute.data_type.clone())),
        ],
    )
}

fn relationship_row(relationship: &RelationshipMetadata) -> QueryRow {
    let kind = match relationship.kind {
        RelationshipKind::OneToMany => "OneToMany",
        RelationshipKind::ManyToMany => "ManyToMany",
    };
    QueryRow::new(
        "relationship",
        vec![
            ("schemaname".to_string(), QueryValue::String(relationship.schema_name.clone())),
            ("kind".to_string(), QueryValue::String(kind.to_string())),
            ("referencingentity".to_string(), QueryValue::String(relationship.referencing_entity.clone())),
            ("referencedentity".to_string(), QueryValue::String(relationship.referenced_entity.clone())),
        ],
    )
}

fn option_set_row(set: &OptionSetMetadata) -> QueryRow {
    QueryRow::new(
        "optionset",
        vec![("schemaname".to_string(), QueryValue::String(set.schema_name.clone()))],
    )
}

fn option_set_value_row(set: &OptionSetMetadata, value: &OptionSetValueMetadata) -> QueryRow {
    QueryRow::new(
        "optionsetvalue",
        vec![
            ("schemaname".to_string(), QueryValue::String(set.schema_name.clone())),
            ("value".to_string(), QueryValue::Int(value.value)),
            ("label".to_string(), QueryValue::String(value.label.clone())),
        ],
    )
}
