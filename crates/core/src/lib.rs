//! Core algorithmic utilities shared by the RuleKit control-plane services.
//!
//! Reporting and job-management endpoints use [`MultiCursorLimitIterator`] to
//! assemble one result page from several independently paginated backends,
//! and [`dereference_json`] to expand `$ref` placeholders in deployment
//! resource documents before they are handed to the scanners.

pub mod dereference;
pub mod paging;
pub mod value;

pub use dereference::{DereferenceError, REF_KEY, dereference_json};
pub use paging::{
    BoxError, Cursor, DEFAULT_PAGE_SIZE, FnCursor, Limit, MultiCursorLimitIterator, NextToken,
    PagingError, TokenError,
};
pub use value::{deep_get, deep_set, map_values_in_place};
