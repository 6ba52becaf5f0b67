//! Tessera Engine
//!
//! Turns custom widget definitions into safe, displayable render results:
//! data fetching, sandboxed transforms, templating, sanitization and the
//! per-instance refresh scheduler.

pub mod coerce;
pub mod dispatch;
pub mod pipeline;
pub mod render;
pub mod resolver;
pub mod sanitize;
pub mod scheduler;
pub mod store;
pub mod style;
pub mod template;
pub mod transform;

pub use dispatch::WidgetTypeDispatcher;
pub use pipeline::WidgetPipeline;
pub use render::RenderResult;
pub use resolver::{extract_path, DataFetcher, DataSourceResolver};
pub use sanitize::{SafeCss, SafeHtml, SanitizationGate};
pub use scheduler::{
    InstanceSummary, InstanceUpdate, WidgetInstance, WidgetRuntime, WidgetState, WidgetSupervisor,
};
pub use store::{store_from_config, HttpWidgetStore, MemoryWidgetStore, WidgetStore};
pub use transform::{EvalError, Evaluator, LuauEvaluator, TransformEngine};
