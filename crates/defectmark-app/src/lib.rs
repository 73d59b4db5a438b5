//! DefectMark host application.
//!
//! Loads an inspection image and its annotations, applies view commands,
//! renders one frame to PNG and optionally saves the annotation set.

mod app;

pub use app::{App, AppError, AppResult, Args, init_logging, load_config};
