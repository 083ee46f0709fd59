
pub mod diffusion;
pub mod model;
pub mod operators;
pub mod stepper;
pub mod tendency;

pub mod grid;
pub mod initial;
pub mod snapshot;
pub mod spectral;
pub mod topography;

pub mod constants;
pub mod error;
pub mod parameters;
pub mod utils;
