//! Command implementations.

pub mod augment;
pub mod export;
pub mod extract;
pub mod media_map;
pub mod schema;

pub use self::augment::execute_augment;
pub use self::export::execute_export;
pub use self::extract::execute_extract;
pub use self::media_map::execute_media_map;
pub use self::schema::execute_schema;
