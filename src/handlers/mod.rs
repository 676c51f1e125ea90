pub mod blob_handlers;
pub mod gallery_handlers;
pub mod health_handlers;
pub mod order_handlers;
pub mod session_handlers;
