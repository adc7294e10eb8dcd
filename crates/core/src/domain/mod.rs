mod error;
mod grading;
mod mark;
mod policy;
mod remark_status;
mod role;

pub use error::DomainError;
pub use grading::{ComponentMark, CourseSummary, letter_grade, summarize_course, validate_component};
pub use mark::validate_mark;
pub use policy::{Action, Actor, Denied, OwnerChain, Resource, authorize, check_lecturer_self_assignment};
pub use remark_status::RemarkStatus;
pub use role::Role;
