pub mod admin;
pub mod auth;
pub mod giveaway;
pub mod participation;
pub mod user;
pub mod winner;

pub use admin::admin_config;
pub use auth::auth_config;
pub use giveaway::giveaway_config;
pub use participation::participation_config;
pub use user::user_config;
pub use winner::winner_config;
