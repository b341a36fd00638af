//! ステップ進行と計測値の収集

pub mod calibration;
pub mod driver;
pub mod hold;
pub mod motion;
pub mod range;
pub mod reps;
pub mod result;
pub mod step;

pub use driver::{Rejection, Session, SessionEvent};
pub use result::{MeasureResult, Merge, StepSnapshot};
pub use step::{default_steps, Gate, GateInput, StepDescriptor, StepId};
