use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("panel `{0}` is not registered with this layout")]
    PanelNotRegistered(String),
    #[error("malformed layout description: {0}")]
    Serialization(#[from] serde_json::Error),
}
