use thiserror::Error;

/// Errors raised while setting up or integrating the model.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Invalid grid: {0}")]
    Grid(String),
    #[error("{name} has shape {found:?} but the model grid is {expected:?}")]
    ShapeMismatch {
        name: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("Integration diverged at step {step}: non-finite values in {field}")]
    Diverged { step: usize, field: &'static str },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Bincode(#[from] bincode::Error),
}

/// Convenience type for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
