pub mod generation_service;
pub mod history_service;
pub mod identity_service;
pub mod import_service;
pub mod question_service;
pub mod review_service;
pub mod session_service;
