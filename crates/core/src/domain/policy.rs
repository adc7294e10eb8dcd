//! Central authorization policy.
//!
//! Every handler resolves the ownership ids for the row under access (via
//! whatever joins its entity needs), then asks this module for a verdict.
//! The rules live in one declarative table (`requirement`) keyed by
//! resource, action, and actor role, instead of being re-stated inline in
//! each handler.

use thiserror::Error;

use super::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i32,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    User,
    Course,
    Enrollment,
    AssessmentComponent,
    StudentMark,
    RemarkRequest,
    AdvisorAssignment,
    AdvisorNote,
    Notification,
}

/// Ownership ids resolved from the row under access.
///
/// Each field names the user entitled to act through that chain (the course's
/// lecturer, the enrollment's student, and so on). For membership-style
/// chains with no single owner id (a student reading components of a course
/// they are enrolled in), the resolver fills the actor's own id when the
/// membership holds and leaves `None` otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OwnerChain {
    pub lecturer_id: Option<i32>,
    pub student_id: Option<i32>,
    pub advisor_id: Option<i32>,
    pub user_id: Option<i32>,
}

impl OwnerChain {
    pub fn lecturer(id: i32) -> Self {
        Self {
            lecturer_id: Some(id),
            ..Self::default()
        }
    }

    pub fn student(id: i32) -> Self {
        Self {
            student_id: Some(id),
            ..Self::default()
        }
    }

    pub fn user(id: i32) -> Self {
        Self {
            user_id: Some(id),
            ..Self::default()
        }
    }

    /// Chain for list endpoints: every slot holds the actor's own id, so the
    /// verdict reduces to "does this role have any owner path at all". The
    /// handler then scopes the query to the same chain.
    pub fn actor_self(id: i32) -> Self {
        Self {
            lecturer_id: Some(id),
            student_id: Some(id),
            advisor_id: Some(id),
            user_id: Some(id),
        }
    }

    pub fn with_lecturer(mut self, id: i32) -> Self {
        self.lecturer_id = Some(id);
        self
    }

    pub fn with_student(mut self, id: i32) -> Self {
        self.student_id = Some(id);
        self
    }

    pub fn with_advisor(mut self, id: i32) -> Self {
        self.advisor_id = Some(id);
        self
    }
}

/// A denial with its human-readable reason. Rendered as HTTP 403 upstream.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct Denied(pub String);

impl Denied {
    fn new(reason: &str) -> Self {
        Self(reason.to_string())
    }
}

const REASON_ADMIN_ONLY: &str = "Access denied: admin only";
const REASON_ROLE: &str = "Access denied for this role.";

enum Requirement {
    /// Any authenticated actor.
    Any,
    /// Allowed when the named owner chain resolves to the actor's id.
    Owner(Chain, &'static str),
    /// Never allowed for this role.
    Forbidden(&'static str),
}

#[derive(Clone, Copy)]
enum Chain {
    Lecturer,
    Student,
    Advisor,
    User,
}

/// The policy table. Admin never reaches this lookup.
fn requirement(resource: Resource, action: Action, role: Role) -> Requirement {
    use Action::*;
    use Requirement::*;
    use Resource::*;

    match (resource, action, role) {
        (User, Read, _) => Owner(
            Chain::User,
            "Access denied: You can only view your own profile.",
        ),
        (User, _, _) => Forbidden(REASON_ADMIN_ONLY),

        (Course, Read, _) => Any,
        (Course, Create, Role::Lecturer) => Any,
        (Course, Create, _) => {
            Forbidden("Access denied: Only admins and lecturers can add courses.")
        }
        (Course, Update, Role::Lecturer) => Owner(
            Chain::Lecturer,
            "Access denied: You can only update courses you are assigned to.",
        ),
        (Course, Update, _) => {
            Forbidden("Access denied: Only admins and lecturers can update courses.")
        }
        (Course, Delete, _) => Forbidden(REASON_ADMIN_ONLY),

        (Enrollment, Read, Role::Student) => Owner(
            Chain::Student,
            "Access denied: You can only view your own enrollments.",
        ),
        (Enrollment, Read, Role::Lecturer) => Owner(
            Chain::Lecturer,
            "Access denied: You can only view enrollments for your courses.",
        ),
        (Enrollment, Read, _) => Forbidden(REASON_ROLE),
        (Enrollment, _, _) => Forbidden(REASON_ADMIN_ONLY),

        (AssessmentComponent, Read, Role::Lecturer) => Owner(
            Chain::Lecturer,
            "Access denied: You can only view components for your courses.",
        ),
        (AssessmentComponent, Read, Role::Student) => Owner(
            Chain::Student,
            "Access denied: You can only view components for courses you are enrolled in.",
        ),
        (AssessmentComponent, Read, _) => Forbidden(REASON_ROLE),
        (AssessmentComponent, Create, Role::Lecturer) => Owner(
            Chain::Lecturer,
            "Access denied: You can only add components to courses you are assigned to.",
        ),
        (AssessmentComponent, Create, _) => {
            Forbidden("Access denied: Only admins and lecturers can add assessment components.")
        }
        (AssessmentComponent, Update, Role::Lecturer) => Owner(
            Chain::Lecturer,
            "Access denied: You can only update components for your courses.",
        ),
        (AssessmentComponent, Update, _) => {
            Forbidden("Access denied: Only admins and lecturers can update assessment components.")
        }
        (AssessmentComponent, Delete, Role::Lecturer) => Owner(
            Chain::Lecturer,
            "Access denied: You can only delete components from courses you are assigned to.",
        ),
        (AssessmentComponent, Delete, _) => {
            Forbidden("Access denied: Only admins and lecturers can delete assessment components.")
        }

        (StudentMark, Read, Role::Student) => Owner(
            Chain::Student,
            "Access denied: You can only view your own marks.",
        ),
        (StudentMark, Read, Role::Lecturer) => Owner(
            Chain::Lecturer,
            "Access denied: You can only view marks for your courses.",
        ),
        (StudentMark, Read, Role::Advisor) => Owner(
            Chain::Advisor,
            "Access denied: You can only view marks for your advisees.",
        ),
        (StudentMark, Read, _) => Forbidden(REASON_ROLE),
        (StudentMark, Create, Role::Lecturer) => Owner(
            Chain::Lecturer,
            "Access denied: You can only record marks for your assigned courses.",
        ),
        (StudentMark, Create, _) => {
            Forbidden("Access denied: Only admins and lecturers can add student marks.")
        }
        (StudentMark, Update, Role::Lecturer) => Owner(
            Chain::Lecturer,
            "Access denied: You can only update marks for your assigned courses.",
        ),
        (StudentMark, Update, _) => {
            Forbidden("Access denied: Only admins and lecturers can update student marks.")
        }
        (StudentMark, Delete, Role::Lecturer) => Owner(
            Chain::Lecturer,
            "Access denied: You can only delete marks for your assigned courses.",
        ),
        (StudentMark, Delete, _) => {
            Forbidden("Access denied: Only admins and lecturers can delete student marks.")
        }

        (RemarkRequest, Read, Role::Student) => Owner(
            Chain::Student,
            "Access denied: You can only view your own remark requests.",
        ),
        (RemarkRequest, Read, Role::Lecturer) => Owner(
            Chain::Lecturer,
            "Access denied: You can only view remark requests for your courses.",
        ),
        (RemarkRequest, Read, Role::Advisor) => Owner(
            Chain::Advisor,
            "Access denied: You can only view remark requests for your advisees.",
        ),
        (RemarkRequest, Create, Role::Student) => Owner(
            Chain::Student,
            "Access denied: You can only request remarks for your own marks.",
        ),
        (RemarkRequest, Create, _) => {
            Forbidden("Access denied: Only students can submit remark requests.")
        }
        (RemarkRequest, Update, Role::Student) => {
            Forbidden("Access denied: Students cannot update remark requests.")
        }
        (RemarkRequest, Update, Role::Lecturer) => Owner(
            Chain::Lecturer,
            "Access denied: You can only update remark requests for your assigned courses.",
        ),
        (RemarkRequest, Delete, Role::Student) => Owner(
            Chain::Student,
            "Access denied: You can only delete your own pending remark requests.",
        ),
        (RemarkRequest, Delete, Role::Lecturer) => Owner(
            Chain::Lecturer,
            "Access denied: You can only delete remark requests for your assigned courses.",
        ),
        (RemarkRequest, _, _) => Forbidden(REASON_ROLE),

        (AdvisorAssignment, Read, Role::Advisor) => Owner(
            Chain::Advisor,
            "Access denied: You can only view your own assigned students.",
        ),
        (AdvisorAssignment, Read, Role::Student) => Owner(
            Chain::Student,
            "Access denied: You can only view your own advisor assignment.",
        ),
        (AdvisorAssignment, Read, _) => Forbidden(REASON_ROLE),
        (AdvisorAssignment, _, _) => Forbidden(REASON_ADMIN_ONLY),

        (AdvisorNote, Read, Role::Advisor) => Owner(
            Chain::Advisor,
            "Access denied: You can only view your own advisor notes.",
        ),
        (AdvisorNote, Read, Role::Student) => Owner(
            Chain::Student,
            "Access denied: You can only view notes about yourself.",
        ),
        (AdvisorNote, Read, _) => Forbidden(REASON_ROLE),
        (AdvisorNote, Create, Role::Advisor) => Owner(
            Chain::Advisor,
            "Access denied: You can only add notes for your own advisees.",
        ),
        (AdvisorNote, Create, _) => {
            Forbidden("Access denied: Only admins and advisors can add notes.")
        }
        (AdvisorNote, Update, Role::Advisor) => Owner(
            Chain::Advisor,
            "Access denied: You can only update your own advisor notes.",
        ),
        (AdvisorNote, Update, _) => {
            Forbidden("Access denied: Only admins and advisors can update notes.")
        }
        (AdvisorNote, Delete, Role::Advisor) => Owner(
            Chain::Advisor,
            "Access denied: You can only delete your own advisor notes.",
        ),
        (AdvisorNote, Delete, _) => {
            Forbidden("Access denied: Only admins and advisors can delete notes.")
        }

        (Notification, Read, _) => Owner(
            Chain::User,
            "Access denied: You can only view your own notifications.",
        ),
        (Notification, Update, _) => Owner(
            Chain::User,
            "Access denied: You can only mark your own notifications as read.",
        ),
        (Notification, Delete, _) => Owner(
            Chain::User,
            "Access denied: You can only delete your own notifications.",
        ),
        (Notification, Create, _) => Forbidden(REASON_ADMIN_ONLY),
    }
}

/// Decide whether `actor` may perform `action` on `resource`, given the
/// ownership ids the handler resolved for the row. Admin is always allowed.
pub fn authorize(
    actor: Actor,
    action: Action,
    resource: Resource,
    owners: &OwnerChain,
) -> Result<(), Denied> {
    if actor.role == Role::Admin {
        return Ok(());
    }

    match requirement(resource, action, actor.role) {
        Requirement::Any => Ok(()),
        Requirement::Owner(chain, reason) => {
            let owner = match chain {
                Chain::Lecturer => owners.lecturer_id,
                Chain::Student => owners.student_id,
                Chain::Advisor => owners.advisor_id,
                Chain::User => owners.user_id,
            };
            if owner == Some(actor.id) {
                Ok(())
            } else {
                Err(Denied::new(reason))
            }
        }
        Requirement::Forbidden(reason) => Err(Denied::new(reason)),
    }
}

/// Self-service constraint on course payloads: a lecturer may only point
/// `lecturer_id` at themselves; reassignment is an admin operation.
pub fn check_lecturer_self_assignment(actor: Actor, lecturer_id: i32) -> Result<(), Denied> {
    if actor.role == Role::Lecturer && lecturer_id != actor.id {
        return Err(Denied::new(
            "Access denied: Lecturers can only assign courses to themselves.",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(id: i32, role: Role) -> Actor {
        Actor { id, role }
    }

    #[test]
    fn admin_is_always_allowed() {
        let admin = actor(1, Role::Admin);
        for resource in [
            Resource::User,
            Resource::Course,
            Resource::Enrollment,
            Resource::AssessmentComponent,
            Resource::StudentMark,
            Resource::RemarkRequest,
            Resource::AdvisorAssignment,
            Resource::AdvisorNote,
            Resource::Notification,
        ] {
            for action in [Action::Read, Action::Create, Action::Update, Action::Delete] {
                assert!(
                    authorize(admin, action, resource, &OwnerChain::default()).is_ok(),
                    "admin denied on {resource:?}/{action:?}"
                );
            }
        }
    }

    #[test]
    fn owner_match_allows_and_mismatch_denies() {
        let lecturer = actor(7, Role::Lecturer);
        assert!(
            authorize(
                lecturer,
                Action::Update,
                Resource::Course,
                &OwnerChain::lecturer(7)
            )
            .is_ok()
        );

        let err = authorize(
            lecturer,
            Action::Update,
            Resource::Course,
            &OwnerChain::lecturer(8),
        )
        .expect_err("other lecturer's course");
        assert_eq!(
            err.0,
            "Access denied: You can only update courses you are assigned to."
        );
    }

    #[test]
    fn every_denial_carries_a_reason() {
        // Non-owning roles across the resource families: all 403 with text.
        let cases = [
            (actor(2, Role::Student), Action::Create, Resource::Course),
            (actor(2, Role::Advisor), Action::Read, Resource::Enrollment),
            (actor(2, Role::Student), Action::Create, Resource::StudentMark),
            (actor(2, Role::Lecturer), Action::Create, Resource::RemarkRequest),
            (actor(2, Role::Student), Action::Delete, Resource::Enrollment),
            (actor(2, Role::Lecturer), Action::Create, Resource::AdvisorNote),
            (actor(2, Role::Advisor), Action::Create, Resource::AdvisorAssignment),
            (actor(2, Role::Student), Action::Read, Resource::User),
        ];
        for (who, action, resource) in cases {
            let err = authorize(who, action, resource, &OwnerChain::default())
                .expect_err("expected denial");
            assert!(!err.0.is_empty(), "{resource:?}/{action:?} lacks a reason");
        }
    }

    #[test]
    fn student_reads_own_records_only() {
        let student = actor(3, Role::Student);
        assert!(
            authorize(
                student,
                Action::Read,
                Resource::StudentMark,
                &OwnerChain::student(3)
            )
            .is_ok()
        );
        let err = authorize(
            student,
            Action::Read,
            Resource::StudentMark,
            &OwnerChain::student(4),
        )
        .expect_err("someone else's mark");
        assert_eq!(err.0, "Access denied: You can only view your own marks.");
    }

    #[test]
    fn advisor_reaches_remark_requests_through_advisee_chain() {
        let advisor = actor(5, Role::Advisor);
        let owners = OwnerChain::student(9).with_advisor(5).with_lecturer(2);
        assert!(authorize(advisor, Action::Read, Resource::RemarkRequest, &owners).is_ok());

        let not_theirs = OwnerChain::student(9).with_advisor(6);
        assert!(authorize(advisor, Action::Read, Resource::RemarkRequest, &not_theirs).is_err());
    }

    #[test]
    fn students_cannot_update_remark_requests() {
        let student = actor(3, Role::Student);
        let err = authorize(
            student,
            Action::Update,
            Resource::RemarkRequest,
            &OwnerChain::student(3),
        )
        .expect_err("students never update requests");
        assert_eq!(
            err.0,
            "Access denied: Students cannot update remark requests."
        );
    }

    #[test]
    fn student_creates_remarks_only_for_own_marks() {
        let student = actor(3, Role::Student);
        assert!(
            authorize(
                student,
                Action::Create,
                Resource::RemarkRequest,
                &OwnerChain::student(3)
            )
            .is_ok()
        );
        let err = authorize(
            student,
            Action::Create,
            Resource::RemarkRequest,
            &OwnerChain::student(4),
        )
        .expect_err("someone else's mark");
        assert_eq!(
            err.0,
            "Access denied: You can only request remarks for your own marks."
        );
    }

    #[test]
    fn lecturer_self_assignment_is_enforced() {
        let lecturer = actor(7, Role::Lecturer);
        assert!(check_lecturer_self_assignment(lecturer, 7).is_ok());
        assert!(check_lecturer_self_assignment(lecturer, 8).is_err());
        // Admins may assign anyone.
        assert!(check_lecturer_self_assignment(actor(1, Role::Admin), 8).is_ok());
    }
}
