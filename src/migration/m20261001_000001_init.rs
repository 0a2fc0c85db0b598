use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Kernel::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Kernel::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Kernel::Name).string().not_null())
                    .col(ColumnDef::new(Kernel::Category).string().not_null())
                    .col(ColumnDef::new(Kernel::KernelType).string().not_null())
                    .col(ColumnDef::new(Kernel::Protocols).text().not_null())
                    .col(ColumnDef::new(Kernel::Status).string().not_null())
                    .col(ColumnDef::new(Kernel::Version).integer().not_null().default(1))
                    .col(ColumnDef::new(Kernel::Config).text().not_null())
                    .col(
                        ColumnDef::new(Kernel::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Kernel::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(User::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(User::Username).string().not_null().unique_key())
                    .col(ColumnDef::new(User::KernelId).string().not_null())
                    .col(ColumnDef::new(User::Protocol).string().not_null())
                    .col(ColumnDef::new(User::DataAllowanceGb).double().not_null())
                    .col(ColumnDef::new(User::DataUsedGb).double().not_null().default(0.0))
                    .col(ColumnDef::new(User::ValidityPeriodDays).integer().not_null())
                    .col(ColumnDef::new(User::SublinkPath).string().not_null().unique_key())
                    .col(
                        ColumnDef::new(User::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(User::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ManagedHost::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ManagedHost::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ManagedHost::Name).string().not_null())
                    .col(ColumnDef::new(ManagedHost::Address).string().not_null())
                    .col(ColumnDef::new(ManagedHost::Port).integer().not_null())
                    .col(ColumnDef::new(ManagedHost::NetworkConfig).text().not_null())
                    .col(ColumnDef::new(ManagedHost::StreamSecurityConfig).text().not_null())
                    .col(
                        ColumnDef::new(ManagedHost::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ManagedHost::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ServerNode::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ServerNode::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ServerNode::Name).string().not_null())
                    .col(ColumnDef::new(ServerNode::Address).string().not_null())
                    .col(ColumnDef::new(ServerNode::Port).integer().not_null())
                    .col(ColumnDef::new(ServerNode::ConnectionType).string().not_null())
                    .col(
                        ColumnDef::new(ServerNode::ConsumptionFactor)
                            .double()
                            .not_null()
                            .default(1.0),
                    )
                    .col(
                        ColumnDef::new(ServerNode::Status)
                            .string()
                            .not_null()
                            .default("offline"),
                    )
                    .col(
                        ColumnDef::new(ServerNode::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ServerNode::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Admin::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Admin::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Admin::Username).string().not_null().unique_key())
                    .col(ColumnDef::new(Admin::PasswordHash).string().not_null())
                    .col(
                        ColumnDef::new(Admin::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Admin::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Admin::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ServerNode::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ManagedHost::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Kernel::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Kernel {
    Table,
    Id,
    Name,
    Category,
    KernelType,
    Protocols,
    Status,
    Version,
    Config,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User {
    Table,
    Id,
    Username,
    KernelId,
    Protocol,
    DataAllowanceGb,
    DataUsedGb,
    ValidityPeriodDays,
    SublinkPath,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ManagedHost {
    Table,
    Id,
    Name,
    Address,
    Port,
    NetworkConfig,
    StreamSecurityConfig,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ServerNode {
    Table,
    Id,
    Name,
    Address,
    Port,
    ConnectionType,
    ConsumptionFactor,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Admin {
    Table,
    Id,
    Username,
    PasswordHash,
    CreatedAt,
    UpdatedAt,
}
