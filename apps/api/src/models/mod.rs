pub mod account;
pub mod free_grant;
pub mod payment;
pub mod roast;
