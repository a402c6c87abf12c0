//! Motion: S-curve integration, line compilation and segment generation

pub mod generator;
pub mod line;
pub mod scurve;

pub use generator::{ActiveGenerator, GeneratorState, TrajectoryEngine};
pub use line::{compile_line, descriptor_size, LineDescriptor, DESCRIPTOR_SIZE};
pub use scurve::{acceleration, distance, velocity, Anchor, Kinematics};
