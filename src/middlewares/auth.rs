use crate::error::AppError;
use crate::utils::{AuthIdentity, JwtService};
use actix_web::http::Method;
use actix_web::http::header::{AUTHORIZATION, HeaderMap};
use actix_web::{
    Error, HttpMessage, HttpRequest,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};
use std::rc::Rc;

/// 免登录访问规则
///
/// 活动浏览与中奖公示只开放只读方法，其余 `/api/v1` 路由都需要 bearer token。
struct PublicRoutes {
    /// 任意方法、完全匹配
    exact: &'static [&'static str],
    /// 任意方法、前缀匹配（文档）
    any_method_prefix: &'static [&'static str],
    /// 仅 GET/HEAD、前缀匹配
    read_only_prefix: &'static [&'static str],
}

const PUBLIC_ROUTES: PublicRoutes = PublicRoutes {
    exact: &[
        "/health",
        "/swagger-ui",
        "/api-docs/openapi.json",
        "/api/v1/auth/refresh",
    ],
    any_method_prefix: &["/swagger-ui/", "/api-docs/"],
    read_only_prefix: &["/api/v1/giveaways", "/api/v1/winners"],
};

impl PublicRoutes {
    fn allows(&self, method: &Method, path: &str) -> bool {
        if method == Method::OPTIONS || self.exact.contains(&path) {
            return true;
        }
        if self.any_method_prefix.iter().any(|p| path.starts_with(p)) {
            return true;
        }
        let read_only = method == Method::GET || method == Method::HEAD;
        read_only && self.read_only_prefix.iter().any(|p| path.starts_with(p))
    }
}

/// 取出 `Authorization: Bearer <token>` 中的 token
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// 校验 access token，并把 `AuthIdentity` 写入请求扩展
pub struct AuthMiddleware {
    jwt_service: JwtService,
}

impl AuthMiddleware {
    pub fn new(jwt_service: JwtService) -> Self {
        Self { jwt_service }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            jwt_service: self.jwt_service.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    jwt_service: JwtService,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let public = PUBLIC_ROUTES.allows(req.method(), req.path());

        // 公开路由上带了有效 token 时同样注入身份
        let identity = bearer_token(req.headers())
            .map(|token| self.jwt_service.verify_access_token(token).map(AuthIdentity::from));

        match identity {
            Some(Ok(identity)) => {
                req.extensions_mut().insert(identity);
            }
            Some(Err(e)) if !public => {
                log::debug!("Rejected access token on {}: {e}", req.path());
                let error = AppError::AuthError("Invalid access token".to_string());
                return Box::pin(async move { Err(error.into()) });
            }
            None if !public => {
                let error = AppError::AuthError("Missing access token".to_string());
                return Box::pin(async move { Err(error.into()) });
            }
            _ => {}
        }

        let service = Rc::clone(&self.service);
        Box::pin(async move { service.call(req).await })
    }
}

/// 从请求扩展中取出已认证身份
pub fn current_identity(req: &HttpRequest) -> Result<AuthIdentity, AppError> {
    req.extensions()
        .get::<AuthIdentity>()
        .cloned()
        .ok_or_else(|| AppError::AuthError("Missing access token".to_string()))
}

/// 管理员身份校验
pub fn require_admin(req: &HttpRequest) -> Result<AuthIdentity, AppError> {
    let identity = current_identity(req)?;
    if !identity.admin {
        return Err(AppError::Forbidden);
    }
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::HeaderValue;

    #[test]
    fn test_public_routes() {
        let get = Method::GET;
        let post = Method::POST;
        assert!(PUBLIC_ROUTES.allows(&get, "/swagger-ui/index.html"));
        assert!(PUBLIC_ROUTES.allows(&get, "/api/v1/giveaways/3"));
        assert!(PUBLIC_ROUTES.allows(&get, "/api/v1/winners"));
        assert!(PUBLIC_ROUTES.allows(&post, "/api/v1/auth/refresh"));
        assert!(PUBLIC_ROUTES.allows(&Method::OPTIONS, "/api/v1/participations"));

        assert!(!PUBLIC_ROUTES.allows(&post, "/api/v1/giveaways"));
        assert!(!PUBLIC_ROUTES.allows(&post, "/api/v1/auth/session"));
        assert!(!PUBLIC_ROUTES.allows(&post, "/api/v1/participations"));
        assert!(!PUBLIC_ROUTES.allows(&get, "/api/v1/admin/giveaways"));
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
