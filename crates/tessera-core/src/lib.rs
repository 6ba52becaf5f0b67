//! Tessera Core Library
//!
//! Widget definitions, engine configuration and the error taxonomy shared
//! by the Tessera widget engine, its web surface and the host binary.

pub mod config;
pub mod error;
pub mod widget;

pub use config::EngineConfig;
pub use error::{TesseraError, TesseraResult};
pub use widget::model::{
    ChartAxes, ChartKind, ChartRow, DataSource, MountConfig, TextFormat, WidgetConfig,
    WidgetDefinition, WidgetKind, WidgetStyle,
};
