use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid field id: {0:?}")]
    InvalidFieldId(String),
    #[error("invalid field key: {0:?}")]
    InvalidFieldKey(String),
    #[error("invalid rule id: {0:?}")]
    InvalidRuleId(String),
    #[error("invalid form id: {0:?}")]
    InvalidFormId(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
