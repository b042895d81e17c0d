use thiserror::Error;

#[derive(Error, Debug)]
pub enum GachaError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Banner '{id}' not found")]
    BannerNotFound { id: String },

    #[error("Invalid pity counter: {value} is outside 1..={cycle}")]
    InvalidPity { value: u32, cycle: u32 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type GachaResult<T> = Result<T, GachaError>;
