mod api_key;
mod pagination;
mod promo_code;
mod promo_code_usage;
mod user;

pub use api_key::*;
pub use pagination::*;
pub use promo_code::*;
pub use promo_code_usage::*;
pub use user::*;
