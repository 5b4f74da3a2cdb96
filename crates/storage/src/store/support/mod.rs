#![forbid(unsafe_code)]

mod json;

pub(super) use json::*;
