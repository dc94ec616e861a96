use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::GiveawayStatus;
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::create_session,
        handlers::auth::refresh,
        handlers::user::get_me,
        handlers::giveaway::list_giveaways,
        handlers::giveaway::get_giveaway,
        handlers::giveaway::get_photo,
        handlers::giveaway::get_giveaway_winners,
        handlers::winner::list_winners,
        handlers::participation::participate,
        handlers::participation::my_participations,
        handlers::participation::participation_status,
        handlers::admin::create_giveaway,
        handlers::admin::update_giveaway,
        handlers::admin::delete_giveaway,
        handlers::admin::upload_photo,
        handlers::admin::list_participations,
        handlers::admin::draw_winner,
        handlers::admin::run_scheduler_tick,
        handlers::admin::dedup_participations,
    ),
    components(
        schemas(
            GiveawayStatus,
            UserResponse,
            AuthResponse,
            RefreshTokenRequest,
            CreateGiveawayRequest,
            UpdateGiveawayRequest,
            GiveawayQuery,
            GiveawayResponse,
            UploadPhotoRequest,
            PhotoResponse,
            CascadeReport,
            ParticipateRequest,
            ParticipationResponse,
            ParticipateResponse,
            ParticipationQuery,
            WinnerResponse,
            DrawResponse,
            WinnerQuery,
            DuplicateGroupReport,
            DedupReport,
            TickReport,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Session API"),
        (name = "user", description = "Current user API"),
        (name = "giveaway", description = "Giveaway browsing API"),
        (name = "participation", description = "Participation API"),
        (name = "winner", description = "Winner history API"),
        (name = "admin", description = "Giveaway administration API"),
    ),
    info(
        title = "Giveaway Backend API",
        version = "1.0.0",
        description = "Giveaway lifecycle and winner selection REST API"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
