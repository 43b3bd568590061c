pub mod claims;
pub mod jwt;
pub mod manager;
pub mod refresh_store;
pub mod user_store;

pub use claims::{Claims, Role, TokenKind};
pub use jwt::{TokenCodec, TokenError};
pub use manager::{AuthManager, LoginOutcome, RefreshOutcome, UserSummary};
pub use refresh_store::{NewRefreshToken, RefreshTokenStore, SeaRefreshTokenStore};
pub use user_store::{SeaUserStore, UserStore};
