//! Commands module - service layer for validation runs

pub(crate) mod service;
mod validate;

pub use service::CfnPolicyValidatorService;
pub use validate::ValidateOptions;
