use thiserror::Error;

/// Errors raised by the legscope core and its front end.
///
/// Geometry that simply cannot be built (unreachable closure joints, empty
/// workspaces) is not an error and is reported through `Option`/empty
/// results instead.
#[derive(Error, Debug)]
pub enum LegscopeError {
    #[error("Input error: {0}")]
    Input(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Optimizer error: {0}")]
    Optimizer(String),

    #[error("Post Processor error: {0}")]
    PostProcessor(String),

    /// `update_params` was called without one of the variant's link lengths.
    #[error("Parameter '{key}' is required by {variant}")]
    MissingParameter { variant: String, key: String },

    #[error("Unknown leg variant '{0}'")]
    UnknownVariant(String),
}
