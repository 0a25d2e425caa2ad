pub mod catalog;
pub mod profile;
pub mod question;
pub mod recommendation;
