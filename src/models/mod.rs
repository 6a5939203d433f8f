pub mod token;
pub mod user;

pub use token::TokenGrant;
pub use user::{ApiEnvelope, UserInfo};
