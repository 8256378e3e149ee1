pub mod api;
pub mod backend_client;
pub mod db;
