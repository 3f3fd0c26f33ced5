//! HTTP request handlers for API endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod delete;
pub mod health;
pub mod list;
pub mod redirect;
pub mod rename;
pub mod shorten;
pub mod upload;

pub use delete::delete_handler;
pub use health::health_handler;
pub use list::list_handler;
pub use redirect::redirect_handler;
pub use rename::rename_handler;
pub use shorten::shorten_handler;
pub use upload::upload_handler;
