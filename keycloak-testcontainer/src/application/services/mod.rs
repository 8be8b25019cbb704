pub mod render;

pub use render::{ContainerPlan, CopySource, PlannedCopy, PortBinding};
