use sea_orm_migration::prelude::*;

use crate::m20250901_000001_create_users::Users;

#[derive(DeriveIden)]
pub enum Codes {
    Table,
    Id,
    UserId,
    Code,
    MonthKey,
    BenefitLabel,
    DisplayPolicy,
    RedeemedAt,
    RedemptionCount,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Codes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Codes::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Codes::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Codes::Code).string_len(64).not_null())
                    // YYYY-MM
                    .col(ColumnDef::new(Codes::MonthKey).string_len(7).not_null())
                    .col(ColumnDef::new(Codes::BenefitLabel).string_len(255).not_null())
                    .col(ColumnDef::new(Codes::DisplayPolicy).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Codes::RedeemedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Codes::RedemptionCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Codes::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp())
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_codes_user")
                            .from(Codes::Table, Codes::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_codes_code_unique")
                    .table(Codes::Table)
                    .col(Codes::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // one code per member, month and policy
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_codes_user_month_policy_unique")
                    .table(Codes::Table)
                    .col(Codes::UserId)
                    .col(Codes::MonthKey)
                    .col(Codes::DisplayPolicy)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().if_exists().table(Codes::Table).to_owned())
            .await
    }
}
