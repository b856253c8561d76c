pub mod handlers;
pub mod router;

pub use router::{app_router, launcher_router, theme_routes};
