//! Credential tiers: OAuth2 gateway tokens, user API tokens, and the secrets behind them.

pub mod gateway;
pub mod secret;
pub mod token;
pub mod user;

pub use gateway::*;
pub use secret::*;
pub use token::*;
pub use user::*;
