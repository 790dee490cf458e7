// Domain layer - Pure value types and calculations
pub mod alert;
pub mod oee;
pub mod snapshot;
pub mod takt;
pub mod update;
