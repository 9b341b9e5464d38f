pub mod identity;
pub mod question;
pub mod quiz_result;
