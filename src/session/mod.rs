pub mod answers;
pub mod controller;
pub mod result;
pub mod timer;

pub use controller::{
    ExamSession, SessionCommand, SessionError, SessionEvent, SessionPhase, SubmitTrigger,
};
