//! Typed operations generated from `operations.toml`.
//!
//! One zero-sized type per entry, named after the operation in PascalCase
//! (`postApiV1BetaGroups` → [`PostApiV1BetaGroups`]), plus [`DESCRIPTORS`].

use super::{HttpMethod, Operation, OperationDescriptor};

include!(concat!(env!("OUT_DIR"), "/operations.rs"));
