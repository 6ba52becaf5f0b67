//! Route handlers.

pub mod instances;
pub mod widgets;
