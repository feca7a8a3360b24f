pub mod auth;
pub mod browse;
pub mod catalog;
pub mod movie_detail;
pub mod wishlist;

pub use auth::{AuthProvider, Session};
pub use catalog::MovieCatalog;
pub use wishlist::{Wishlist, WishlistChange, WishlistView};
