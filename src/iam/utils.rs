use reqwest::StatusCode;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status_code} {status_text}")]
pub struct ServerError {
    pub status_code: u16,
    pub status_text: String,
}

impl From<StatusCode> for ServerError {
    fn from(status: StatusCode) -> Self {
        Self {
            status_code: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_owned(),
        }
    }
}

pub fn check_status(status: StatusCode) -> Result<(), ServerError> {
    if !status.is_success() {
        return Err(status.into());
    }
    Ok(())
}
