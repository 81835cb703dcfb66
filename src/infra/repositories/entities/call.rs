//! Call database entity for SeaORM.
//!
//! Free-form parts of a call (details, metadata, transcript) live in JSONB
//! columns so records keep their document shape.

use sea_orm::entity::prelude::*;
use sea_orm::Set;

use crate::domain::Call;
use crate::errors::{AppError, AppResult};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "calls")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_id: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub call_details: Json,
    pub status: String,
    pub start_time: DateTimeUtc,
    pub end_time: Option<DateTimeUtc>,
    pub duration: Option<f64>,
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub transcript: Json,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Creator,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Creator.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Convert database model to domain entity
impl TryFrom<Model> for Call {
    type Error = AppError;

    fn try_from(model: Model) -> AppResult<Self> {
        let corrupt = |column: &str, e: &dyn std::fmt::Display| {
            AppError::internal(format!("Corrupt {} on call {}: {}", column, model.id, e))
        };

        Ok(Call {
            id: model.id,
            customer_id: model.customer_id.clone(),
            call_details: model.call_details.clone(),
            status: model.status.parse().map_err(|e| corrupt("status", &e))?,
            start_time: model.start_time,
            end_time: model.end_time,
            duration: model.duration,
            metadata: serde_json::from_value(model.metadata.clone())
                .map_err(|e| corrupt("metadata", &e))?,
            transcript: serde_json::from_value(model.transcript.clone())
                .map_err(|e| corrupt("transcript", &e))?,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl ActiveModel {
    /// Every column set from the domain record.
    pub fn from_call(call: &Call) -> AppResult<Self> {
        let to_json = |value: serde_json::Result<Json>| {
            value.map_err(|e| AppError::internal(format!("Failed to encode call: {}", e)))
        };

        Ok(ActiveModel {
            id: Set(call.id),
            customer_id: Set(call.customer_id.clone()),
            call_details: Set(call.call_details.clone()),
            status: Set(call.status.to_string()),
            start_time: Set(call.start_time),
            end_time: Set(call.end_time),
            duration: Set(call.duration),
            metadata: Set(to_json(serde_json::to_value(&call.metadata))?),
            transcript: Set(to_json(serde_json::to_value(&call.transcript))?),
            created_by: Set(call.created_by),
            created_at: Set(call.created_at),
            updated_at: Set(call.updated_at),
        })
    }
}
