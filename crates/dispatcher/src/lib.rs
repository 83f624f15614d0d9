//! # Dispatcher
//!
//! 数据分发模块。
//!
//! 负责：
//! - 把每个入站 chunk 复制到所有 route
//! - 每个 route 独立的 buffer、延迟策略与 worker
//! - 隔离慢 route，不阻塞入站读取

pub mod dispatcher;
pub mod error;
pub mod fanout;
pub mod handle;
pub mod metrics;
pub mod route;
pub mod sink;
pub mod transport;
pub mod worker;

pub use contracts::StreamSink;
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::DispatcherError;
pub use fanout::FanOut;
pub use handle::RouteHandle;
pub use metrics::{MetricsSnapshot, RouteMetrics, WorkerState};
pub use route::{split_host_port, Route};
pub use worker::{RouteReport, RouteWorker};
