pub mod account;
pub mod election;
pub mod session;
