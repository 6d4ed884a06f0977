//! HTTP protocol layer module
//!
//! Response builders, the cross-origin decorator and static-file helpers,
//! decoupled from the resource handlers.

pub mod cache;
pub mod cors;
pub mod mime;
pub mod response;

pub use cors::{decorate, decorate_preflight};
pub use response::{
    build_304_response, build_cached_response, build_preflight_response, json_response,
    text_response,
};
