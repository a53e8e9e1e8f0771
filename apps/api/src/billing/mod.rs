pub mod handlers;
pub mod stripe;
