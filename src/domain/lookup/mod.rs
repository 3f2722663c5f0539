//! Lookup domain - requests, results and validation

mod request;
mod result;
mod validation;

pub use request::{parse_key_value, LookupRequest};
pub use result::LookupResult;
pub use validation::{
    key_value_text, validate_identifier, IdentifierKind, LookupValidationError,
    MAX_IDENTIFIER_LENGTH,
};
