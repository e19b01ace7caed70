use thiserror::Error;

#[derive(Debug, Error)]
pub enum SkystepError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Tutorial task list is empty")]
    EmptyTaskList,

    #[error("Checkpoint course has no gates")]
    EmptyCourse,

    #[error("Task {index} references unknown predicate `{name}`")]
    UnknownPredicate { index: usize, name: String },

    #[error("Task {index} references unknown event `{name}`")]
    UnknownEvent { index: usize, name: String },

    #[error("No scripted maneuver for predicate `{0}`")]
    Unscriptable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
