//! Shared primitives for the voting core workspace: a seedable CSPRNG,
//! a fixed-size digest type, and canonical JSON rendering for anything
//! that gets hashed rather than merely stored.

pub mod canonical;
pub mod csprng;
pub mod hash;

pub use canonical::canonical_json_string;
pub use csprng::Csprng;
pub use hash::HValue;
