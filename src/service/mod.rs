pub mod chat_service;
pub mod rate_limiter;
pub mod validator;
