pub mod authorization_request;
pub mod credential;
pub mod credential_offer;
pub mod error;
pub mod object;
pub mod presentation_definition;
pub mod presentation_submission;
pub mod response;
pub mod token_request;
pub mod util;
