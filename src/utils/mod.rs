pub mod jwt;
pub mod period;
pub mod picker;

pub use jwt::*;
pub use period::compute_end_date;
pub use picker::{SeededPicker, ThreadRngPicker, WinnerPicker};
