//! Launchdeck front-end glue: the application controller and process-level
//! error reporting shared by every front end.

pub mod controller;
pub mod fatal;

pub use controller::{
    DatasetKind, LauncherController, RemoveError, SelectionError, WeatherLocation, WeatherStatus,
};
