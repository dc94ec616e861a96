use crate::entities::user_entity as users;
use crate::error::{AppError, AppResult};
use crate::utils::AuthIdentity;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

#[derive(Clone)]
pub struct UserService {
    pool: DatabaseConnection,
}

impl UserService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 按 discord_id 创建或刷新用户（每次认证成功都调用）
    ///
    /// 使用 ON CONFLICT 更新，并发登录同一账号也只会有一条记录。
    pub async fn upsert_identity(&self, identity: &AuthIdentity) -> AppResult<users::Model> {
        if identity.discord_id.trim().is_empty() {
            return Err(AppError::AuthError("Missing identity".into()));
        }
        let now = Utc::now();

        users::Entity::insert(users::ActiveModel {
            discord_id: Set(identity.discord_id.clone()),
            username: Set(identity.username.clone()),
            avatar: Set(identity.avatar.clone()),
            email: Set(identity.email.clone()),
            is_active: Set(true),
            is_admin: Set(identity.admin),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(users::Column::DiscordId)
                .update_columns([
                    users::Column::Username,
                    users::Column::Avatar,
                    users::Column::Email,
                    users::Column::IsActive,
                    users::Column::IsAdmin,
                    users::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(&self.pool)
        .await?;

        self.get_by_discord_id(&identity.discord_id).await
    }

    pub async fn get_by_discord_id(&self, discord_id: &str) -> AppResult<users::Model> {
        users::Entity::find()
            .filter(users::Column::DiscordId.eq(discord_id))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}
