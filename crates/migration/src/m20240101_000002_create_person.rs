//! Create `person` table with nullable FK to `team`.
//!
//! `guid` is the externally stable identifier; `id` is backend-assigned.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Person::Table)
                    .if_not_exists()
                    .col(pk_auto(Person::Id))
                    .col(uuid(Person::Guid).unique_key().not_null())
                    .col(string_len(Person::FullName, 255).not_null())
                    .col(integer(Person::BirthYear).not_null())
                    .col(ColumnDef::new(Person::TeamId).integer().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_person_team")
                            .from(Person::Table, Person::TeamId)
                            .to(Team::Table, Team::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_person_full_name")
                    .table(Person::Table)
                    .col(Person::FullName)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Person::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Person { Table, Id, Guid, FullName, BirthYear, TeamId }

#[derive(DeriveIden)]
enum Team { Table, Id }
