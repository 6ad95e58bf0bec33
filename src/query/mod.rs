/*!
 * Query Engine
 * Cursor pagination and the category filter model
 */

pub mod cursor;
pub mod filters;
pub mod mapping;

pub use cursor::{CursorMeta, CursorPage, CursorPaginator, CursorRequest};
pub use filters::CursorFilters;
pub use mapping::{apply_filters, is_reserved, storage_key, FilterKeyTable};
