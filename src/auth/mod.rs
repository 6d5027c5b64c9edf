pub mod middleware;
pub mod token;

pub use middleware::{authorize_request, extract_bearer, AuthDecision, RouteAuthorizer};
pub use token::{Claims, InvalidToken, TokenCodec};
