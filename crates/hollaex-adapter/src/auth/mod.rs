/*
[INPUT]:  API credentials and request parts
[OUTPUT]: Signature header sets for REST and streaming authentication
[POS]:    Auth layer - handles HollaEx API authentication
[UPDATE]: When auth flow or signature methods change
*/

pub mod credentials;
pub mod signer;

pub use credentials::Credentials;
pub use signer::{
    API_EXPIRES_HEADER, API_KEY_HEADER, API_SIGNATURE_HEADER, Clock, RequestSigner,
    SignatureHeaders, SystemClock,
};
