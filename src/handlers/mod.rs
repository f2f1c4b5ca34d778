pub mod oauth;
pub mod publish;
