mod error;
mod patch;
mod traits;
mod types;
mod validation;

pub use error::{RepositoryError, Result};
pub use patch::apply_update;
pub use traits::Repository;
pub use types::{paginate, DeleteTarget, EntityUpdate, Items, Page, PageRequest, MAX_PAGE_SIZE};
pub use validation::{validate_delete, validate_inserts, validate_page, validate_updates};
