pub mod account;
pub mod board;
pub mod connect;
pub mod layout;
pub mod notice;
