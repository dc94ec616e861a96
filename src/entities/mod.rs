pub mod giveaways;
pub mod participations;
pub mod photos;
pub mod users;
pub mod winners;

pub use giveaways as giveaway_entity;
pub use giveaways::GiveawayStatus;
pub use participations as participation_entity;
pub use photos as photo_entity;
pub use users as user_entity;
pub use winners as winner_entity;
