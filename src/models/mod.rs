//! Data models for the Globus APIs.
//!
//! - [`primitives`] - ID newtypes and the deployment [`Environment`]
//! - [`enums`] - Service names and task enumerations
//! - [`transfer`] - Transfer listing models

pub mod primitives;
pub mod enums;
pub mod transfer;

pub use primitives::*;
pub use enums::*;
pub use transfer::*;
