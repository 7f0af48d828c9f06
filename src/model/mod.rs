mod auth;
mod descriptor;
mod outcome;
mod response;

pub use auth::{looks_like_jwt, ApiKeyLocation, AuthSpec};
pub use descriptor::{HttpMethod, Param, RequestDescriptor, GENERIC_INTENT};
pub use outcome::{Outcome, RequestContext};
pub use response::{PaginationSignal, RawResponse, SizeExceeded, Transport};
