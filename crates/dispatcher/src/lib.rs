//! # Dispatcher
//!
//! 有界并发分发模块。
//!
//! 负责：
//! - 从 `DataSource` 顺序拉取条目
//! - 以固定容量限制在途单元，提交到工作线程池
//! - 关闭流程：关闭数据源、限时等待在途单元、回调 `task_complete()`
//! - 致命错误单次上报 (`FatalErrorGate`)
//!
//! ## Usage Example
//!
//! ```ignore
//! use dispatcher::{DispatcherBuilder, LogTask};
//! use sources::MockSource;
//!
//! let dispatcher = DispatcherBuilder::<String>::new(
//!     Arc::new(MockSource::numbered(1000)),
//!     Arc::new(LogTask::new("log")),
//!     controller,
//! )
//! .queue_depth(100)
//! .parallelism(8)
//! .cancellation(token)
//! .build()?;
//!
//! let summary = dispatcher.run()?;
//! println!("{}", summary.throughput);
//! ```

pub mod admission;
pub mod dispatcher;
pub mod error;
pub mod fatal;
pub mod isolate;
pub mod metrics;
pub mod pool;
pub mod tasks;

pub use contracts::{DataSource, TaskController, WorkerTask};
pub use dispatcher::{BoundedDispatcher, DispatcherBuilder, RunSummary};
pub use error::{DispatcherError, Phase};
pub use fatal::{FatalErrorGate, ProcessExit, Terminator, EXIT_CODE};
pub use metrics::{DispatchMetrics, MetricsSnapshot, Throughput};
pub use pool::WorkerPool;
pub use tasks::{build_task, FileTask, LogTask};
pub use tokio_util::sync::CancellationToken;
