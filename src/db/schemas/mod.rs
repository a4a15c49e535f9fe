//! Database schemas for the cohort engine
//!
//! Defines MongoDB document structures for users, profiles, account
//! membership, ID codes, and basket entries.

mod account_profile;
mod basket;
mod id_code;
mod metadata;
mod profile;
mod user;

pub use account_profile::{AccountProfileDoc, ACCOUNT_PROFILE_COLLECTION};
pub use basket::{ActivitySelection, BasketEntryDoc, BASKET_COLLECTION};
pub use id_code::{IdCodeDoc, ID_CODE_COLLECTION};
pub use metadata::Metadata;
pub use profile::{ProfileDoc, PROFILE_COLLECTION};
pub use user::{UserDoc, USER_COLLECTION};
