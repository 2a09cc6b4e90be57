pub mod config;
pub mod dispatcher;
pub mod types;

pub use config::{DeblurConfig, FastTuning, MethodConfig};
pub use dispatcher::{Dispatcher, PreviewFrame, PreviewSink};
pub use types::{CancelToken, JobContext, NoOpProgress, ProgressSink, ProgressSpan};
