//! # Desired State
//!
//! The declarative document a run converges the server to, and how it is
//! loaded from disk.

pub mod loader;
pub mod types;

pub use loader::{load_file, load_path};
pub use types::{
    AppRoleProperties, AuthBackend, FieldPair, GenericSecret, Mount, PolicyDefinition, PropertyBag,
    RolePolicy, TransitKey, UserAccount, VaultConfig, IGNORE_SENTINEL,
};
