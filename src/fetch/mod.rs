pub mod aggregate;
pub mod classify;
pub mod credentials;
pub mod decode;
pub mod request;
pub mod result;
pub mod rotation;
pub mod transport;

#[cfg(test)]
pub mod testutils;

pub use aggregate::{best_effort, collect_slots, gather, merge_shallow, run_all};
pub use classify::{AttemptOutcome, ProviderRules, ALPHA_VANTAGE_RULES};
pub use credentials::{Credential, CredentialPool};
pub use request::RequestDescriptor;
pub use result::{ErrorBody, FetchError, FetchResult};
pub use rotation::{advance, ResilientFetcher, RotationState};
pub use transport::{HttpMethod, HttpReply, HttpRequest, HttpTransport, ReqwestTransport, TransportError};
