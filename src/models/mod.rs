pub mod giveaway;
pub mod maintenance;
pub mod pagination;
pub mod participation;
pub mod user;
pub mod winner;

pub use giveaway::*;
pub use maintenance::*;
pub use pagination::*;
pub use participation::*;
pub use user::*;
pub use winner::*;
