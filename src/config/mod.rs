// Configuration modules

pub mod policy;

pub use policy::{AntiFloodSettings, SchedulerSettings};
