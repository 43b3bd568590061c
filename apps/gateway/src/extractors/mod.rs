pub mod bearer;
pub mod identity;
pub mod validated_json;

pub use bearer::{BearerToken, OptionalBearer};
pub use identity::Identity;
pub use validated_json::{Validate, ValidatedJson};
