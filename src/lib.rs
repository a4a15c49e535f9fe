//! Cohort - identity, role, and relationship resolution engine
//!
//! The stateful core of a multi-tenant survey platform. Users belong to
//! accounts; within an account each applet grants a role-scoped Profile,
//! and profiles can also stand for passive subjects who never log in,
//! addressed only via account-scoped ID codes.
//!
//! ## Services
//!
//! - **Identity**: resolves profile ids and ID codes to canonical profiles,
//!   with role-gated visibility
//! - **Roles**: per-applet role sets; `is_coordinator` gates every
//!   privileged mutation
//! - **Relations**: directed typed edges between profiles with one-hop
//!   reciprocal inference
//! - **Passive**: login-less subject profiles, addressable from creation
//! - **IdCodes**: account-scoped aliases, never leaving a profile
//!   unaddressable
//! - **Basket**: per-user selection staging with activity-granular merges
//! - **Schedule**: independent self/coordinator schedule override layers
//! - **Accounts**: the single write path keeping the role index consistent

pub mod accounts;
pub mod basket;
pub mod config;
pub mod db;
pub mod engine;
pub mod external;
pub mod identity;
pub mod idcodes;
pub mod logging;
pub mod passive;
pub mod relations;
pub mod roles;
pub mod schedule;
pub mod types;
pub mod users;

pub use config::Args;
pub use engine::Engine;
pub use identity::{Addressor, ProfileView};
pub use roles::{Role, RoleSet};
pub use types::{Actor, CohortError, Result};
