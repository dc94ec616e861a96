use crate::error::{AppError, AppResult};
use crate::models::AuthResponse;
use crate::services::UserService;
use crate::utils::{AuthIdentity, JwtService};

/// 会话服务
///
/// Discord OAuth 握手由身份网关完成并签发 access token，
/// 这里只负责把身份落库（upsert）并签发/刷新本站令牌。
#[derive(Clone)]
pub struct AuthService {
    jwt_service: JwtService,
    user_service: UserService,
}

impl AuthService {
    pub fn new(jwt_service: JwtService, user_service: UserService) -> Self {
        Self {
            jwt_service,
            user_service,
        }
    }

    /// 建立会话：刷新用户资料并签发新的令牌对
    pub async fn establish_session(&self, identity: &AuthIdentity) -> AppResult<AuthResponse> {
        let user = self.user_service.upsert_identity(identity).await?;
        if !user.is_active {
            return Err(AppError::AuthError("Account is disabled".into()));
        }
        log::info!("Session established for {} ({})", user.username, user.discord_id);

        Ok(AuthResponse {
            access_token: self.jwt_service.generate_access_token(identity)?,
            refresh_token: self.jwt_service.generate_refresh_token(identity)?,
            expires_in: self.jwt_service.get_access_token_expires_in(),
            user: user.into(),
        })
    }

    /// 用 refresh token 换取新的令牌对
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AuthResponse> {
        let claims = self.jwt_service.verify_refresh_token(refresh_token)?;
        let mut identity = AuthIdentity::from(claims);
        let user = self.user_service.get_by_discord_id(&identity.discord_id).await?;
        if !user.is_active {
            return Err(AppError::AuthError("Account is disabled".into()));
        }
        // 以库中的权限为准
        identity.admin = user.is_admin;

        Ok(AuthResponse {
            access_token: self.jwt_service.generate_access_token(&identity)?,
            refresh_token: self.jwt_service.generate_refresh_token(&identity)?,
            expires_in: self.jwt_service.get_access_token_expires_in(),
            user: user.into(),
        })
    }
}
