use sea_orm_migration::prelude::*;

/// 用户表（一个 Discord 身份一条记录）
#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    DiscordId,
    Username,
    Avatar,
    Email,
    IsActive,
    IsAdmin,
    CreatedAt,
    UpdatedAt,
}

/// 抽奖活动表
#[derive(DeriveIden)]
enum Giveaways {
    Table,
    Id,
    Name,
    Description,
    Status,
    StartDate,
    EndDate,
    DurationDays,
    DurationHours,
    ParticipantCount,
    WinnerCount,
    MilestoneNotified,
    CreatedAt,
    UpdatedAt,
}

/// 活动图片表
#[derive(DeriveIden)]
enum Photos {
    Table,
    Id,
    GiveawayId,
    Position,
    Mimetype,
    Data,
    CreatedAt,
}

/// 参与记录表
#[derive(DeriveIden)]
enum Participations {
    Table,
    Id,
    UserId,
    GiveawayId,
    ParticipatedAt,
}

/// 中奖记录表（历史快照，活动删除后仍保留）
#[derive(DeriveIden)]
enum Winners {
    Table,
    Id,
    GiveawayId,
    GiveawayName,
    UserId,
    DiscordId,
    Name,
    WonAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::DiscordId).string_len(64).not_null())
                    .col(ColumnDef::new(Users::Username).string_len(255).not_null())
                    .col(ColumnDef::new(Users::Avatar).string_len(512).null())
                    .col(ColumnDef::new(Users::Email).string_len(255).null())
                    .col(
                        ColumnDef::new(Users::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Users::IsAdmin)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_users_discord_id_unique")
                    .table(Users::Table)
                    .col(Users::DiscordId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Giveaways::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Giveaways::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Giveaways::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Giveaways::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    // active / paused / completed
                    .col(
                        ColumnDef::new(Giveaways::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Giveaways::StartDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Giveaways::EndDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Giveaways::DurationDays)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Giveaways::DurationHours)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Giveaways::ParticipantCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Giveaways::WinnerCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Giveaways::MilestoneNotified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Giveaways::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Giveaways::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 调度器按 (status, end_date) 扫描过期活动
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_giveaways_status_end_date")
                    .table(Giveaways::Table)
                    .col(Giveaways::Status)
                    .col(Giveaways::EndDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Photos::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Photos::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Photos::GiveawayId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Photos::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Photos::Mimetype).string_len(64).not_null())
                    .col(ColumnDef::new(Photos::Data).text().not_null())
                    .col(
                        ColumnDef::new(Photos::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    // 不使用 ON DELETE CASCADE，级联删除由服务层显式执行并计数
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_photos_giveaway")
                            .from(Photos::Table, Photos::GiveawayId)
                            .to(Giveaways::Table, Giveaways::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_photos_giveaway")
                    .table(Photos::Table)
                    .col(Photos::GiveawayId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Participations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Participations::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Participations::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    // NULL = 未绑定活动的通用参与
                    .col(
                        ColumnDef::new(Participations::GiveawayId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Participations::ParticipatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_participations_user")
                            .from(Participations::Table, Participations::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_participations_giveaway")
                            .from(Participations::Table, Participations::GiveawayId)
                            .to(Giveaways::Table, Giveaways::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 同一用户同一活动只能参与一次，并发下的唯一正确性保证
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_participations_user_giveaway_unique")
                    .table(Participations::Table)
                    .col(Participations::UserId)
                    .col(Participations::GiveawayId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_participations_giveaway")
                    .table(Participations::Table)
                    .col(Participations::GiveawayId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Winners::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Winners::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    // 无外键：活动被清理后中奖记录仍需保留
                    .col(ColumnDef::new(Winners::GiveawayId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Winners::GiveawayName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Winners::UserId).big_integer().null())
                    .col(ColumnDef::new(Winners::DiscordId).string_len(64).not_null())
                    .col(ColumnDef::new(Winners::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Winners::WonAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_winners_giveaway")
                    .table(Winners::Table)
                    .col(Winners::GiveawayId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 删除顺序：依赖表在前
        manager
            .drop_table(Table::drop().if_exists().table(Winners::Table).to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(Participations::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Photos::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Giveaways::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}
