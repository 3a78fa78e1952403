pub mod auth;
pub mod rate_limit;
pub mod request_trace;

pub use auth::{AuthenticatedUser, UserAuth, resolve_token_user};
pub use rate_limit::{ClientIpKeyExtractor, IpRateLimiter, RateLimiters};
pub use request_trace::{RequestId, RequestTrace};
