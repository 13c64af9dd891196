//! Route handlers. Everything here except `health` runs behind the request guard.

pub mod books;
pub mod health;
pub mod login;
pub mod root;
