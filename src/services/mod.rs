pub mod auth_service;
pub mod dedup_service;
pub mod giveaway_service;
pub mod participation_service;
pub mod user_service;
pub mod winner_service;

pub use auth_service::*;
pub use dedup_service::*;
pub use giveaway_service::GiveawayService;
pub use participation_service::*;
pub use user_service::*;
pub use winner_service::*;
