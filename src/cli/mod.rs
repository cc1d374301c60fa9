pub mod login;
pub mod output;
pub mod request;
