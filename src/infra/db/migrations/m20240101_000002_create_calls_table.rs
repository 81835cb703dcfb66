//! Migration: Create calls table and its query indexes.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_users_table::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Calls::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Calls::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Calls::CustomerId).string().not_null())
                    .col(ColumnDef::new(Calls::CallDetails).json_binary().not_null())
                    .col(
                        ColumnDef::new(Calls::Status)
                            .string_len(16)
                            .not_null()
                            .default("initiated"),
                    )
                    .col(
                        ColumnDef::new(Calls::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Calls::EndTime).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Calls::Duration).double().null())
                    .col(ColumnDef::new(Calls::Metadata).json_binary().not_null())
                    .col(ColumnDef::new(Calls::Transcript).json_binary().not_null())
                    .col(ColumnDef::new(Calls::CreatedBy).uuid().null())
                    .col(
                        ColumnDef::new(Calls::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Calls::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_calls_created_by")
                            .from(Calls::Table, Calls::CreatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_calls_status_created_at")
                    .table(Calls::Table)
                    .col(Calls::Status)
                    .col((Calls::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_calls_customer_created_at")
                    .table(Calls::Table)
                    .col(Calls::CustomerId)
                    .col((Calls::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_calls_customer_id")
                    .table(Calls::Table)
                    .col(Calls::CustomerId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Indexes go with the table
        manager
            .drop_table(Table::drop().table(Calls::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Calls {
    Table,
    Id,
    CustomerId,
    CallDetails,
    Status,
    StartTime,
    EndTime,
    Duration,
    Metadata,
    Transcript,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}
