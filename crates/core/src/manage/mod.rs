//! Catalog management for shop owners.
//!
//! Every operation takes the caller's [`AuthContext`](crate::auth::AuthContext)
//! explicitly and checks role and shop ownership before writing.

mod manager;
mod types;

pub use manager::{generate_sku, CatalogManager};
pub use types::{ManageError, NewProduct, MAX_NAME_LEN, MAX_SKU_LEN};
