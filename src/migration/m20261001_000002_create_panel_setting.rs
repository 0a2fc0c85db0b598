use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PanelSetting::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PanelSetting::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PanelSetting::Key)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(PanelSetting::Value).text().not_null())
                    .col(ColumnDef::new(PanelSetting::Description).string().not_null())
                    .col(ColumnDef::new(PanelSetting::ValueType).string().not_null())
                    .col(
                        ColumnDef::new(PanelSetting::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PanelSetting::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 插入默认设置
        let insert = Query::insert()
            .into_table(PanelSetting::Table)
            .columns([
                PanelSetting::Key,
                PanelSetting::Value,
                PanelSetting::Description,
                PanelSetting::ValueType,
            ])
            .values_panic([
                "panel_name".into(),
                "\"Kernel Panel\"".into(),
                "面板名称".into(),
                "string".into(),
            ])
            .values_panic([
                "session_timeout_minutes".into(),
                "30".into(),
                "管理会话空闲超时（分钟）".into(),
                "number".into(),
            ])
            .values_panic([
                "xray_inbounds".into(),
                "[]".into(),
                "面板级 Xray 入站列表".into(),
                "json".into(),
            ])
            .values_panic([
                "telegram_enabled".into(),
                "false".into(),
                "是否启用 Telegram 机器人通知".into(),
                "boolean".into(),
            ])
            .values_panic([
                "telegram_bot_token".into(),
                "\"\"".into(),
                "Telegram 机器人令牌".into(),
                "string".into(),
            ])
            .values_panic([
                "telegram_admin_chat_id".into(),
                "\"\"".into(),
                "接收通知的管理员 Chat ID".into(),
                "string".into(),
            ])
            .values_panic([
                "blocked_countries".into(),
                "[]".into(),
                "禁止访问的国家代码".into(),
                "json".into(),
            ])
            .values_panic([
                "domain".into(),
                "\"\"".into(),
                "面板域名".into(),
                "string".into(),
            ])
            .values_panic([
                "ssl_enabled".into(),
                "false".into(),
                "是否启用 HTTPS".into(),
                "boolean".into(),
            ])
            .values_panic([
                "ssl_cert_path".into(),
                "\"\"".into(),
                "证书文件路径".into(),
                "string".into(),
            ])
            .values_panic([
                "ssl_key_path".into(),
                "\"\"".into(),
                "私钥文件路径".into(),
                "string".into(),
            ])
            .to_owned();

        manager.exec_stmt(insert).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PanelSetting::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PanelSetting {
    Table,
    Id,
    Key,
    Value,
    Description,
    ValueType,
    CreatedAt,
    UpdatedAt,
}
