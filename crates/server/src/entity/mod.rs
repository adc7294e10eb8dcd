pub mod advisor_note;
pub mod advisor_student;
pub mod assessment_component;
pub mod course;
pub mod enrollment;
pub mod notification;
pub mod remark_request;
pub mod student_mark;
pub mod user;
