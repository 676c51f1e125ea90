pub mod deleter;
pub mod editor;
pub mod gallery_list;
pub mod gallery_service;
pub mod orders;
pub mod session_gate;
pub mod upload;
