use sea_orm_migration::prelude::*;

use crate::m20250901_000001_create_users::Users;
use crate::m20250901_000002_create_codes::Codes;

#[derive(DeriveIden)]
enum Redemptions {
    Table,
    Id,
    CodeId,
    UserId,
    StaffId,
    StoreId,
    GrossAmountCents,
    DiscountType,
    DiscountValue,
    AmountSavedCents,
    TillTxnId,
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
                    .table(Redemptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Redemptions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Redemptions::CodeId).big_integer().not_null())
                    .col(ColumnDef::new(Redemptions::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Redemptions::StaffId).text().null())
                    .col(ColumnDef::new(Redemptions::StoreId).text().null())
                    .col(
                        ColumnDef::new(Redemptions::GrossAmountCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Redemptions::DiscountType).string_len(16).not_null())
                    .col(ColumnDef::new(Redemptions::DiscountValue).double().not_null())
                    .col(
                        ColumnDef::new(Redemptions::AmountSavedCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Redemptions::TillTxnId).text().null())
                    .col(
                        ColumnDef::new(Redemptions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_redemptions_code")
                            .from(Redemptions::Table, Redemptions::CodeId)
                            .to(Codes::Table, Codes::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_redemptions_user")
                            .from(Redemptions::Table, Redemptions::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // a till transaction can consume a code only once; NULL till ids never collide
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_redemptions_code_till_txn_unique")
                    .table(Redemptions::Table)
                    .col(Redemptions::CodeId)
                    .col(Redemptions::TillTxnId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_redemptions_user_created")
                    .table(Redemptions::Table)
                    .col(Redemptions::UserId)
                    .col(Redemptions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().if_exists().table(Redemptions::Table).to_owned())
            .await
    }
}
