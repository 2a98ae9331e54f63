pub mod camera;
pub mod cli;
pub mod config;
pub mod detector;
pub mod report;
pub mod runner;

pub use camera::{CameraSource, FrameSource};
pub use cli::{execute, run_cli, Cli};
pub use config::{load_config, Config};
pub use detector::{resolve_model_path, Detect, Detection, FaceDetector};
pub use report::{Report, Reporter};
pub use runner::{run, Summary};
