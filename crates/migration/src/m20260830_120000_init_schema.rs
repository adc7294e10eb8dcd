use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(pk_auto(User::UserId))
                    .col(string_len(User::Username, 50).unique_key())
                    .col(string_len(User::PasswordHash, 255))
                    // Role enum is validated in app code; the check is a backstop.
                    .col(string_len(User::Role, 20).check(
                        Expr::col(User::Role).is_in(["admin", "lecturer", "student", "advisor"]),
                    ))
                    .col(string_len_null(User::Email, 255).unique_key())
                    .col(string_len(User::FullName, 100))
                    .col(string_len_null(User::MatricNumber, 50).unique_key())
                    .col(string_len_null(User::Pin, 20))
                    .col(text_null(User::ProfilePicture))
                    .col(timestamp(User::CreatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Course::Table)
                    .if_not_exists()
                    .col(pk_auto(Course::CourseId))
                    .col(string_len(Course::CourseCode, 20).unique_key())
                    .col(string_len(Course::CourseName, 100))
                    .col(integer(Course::LecturerId))
                    .col(
                        small_integer(Course::CreditHours)
                            .default(3)
                            .check(Expr::col(Course::CreditHours).gt(0)),
                    )
                    .col(timestamp(Course::CreatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-courses-lecturer_id")
                            .from(Course::Table, Course::LecturerId)
                            .to(User::Table, User::UserId)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Enrollment::Table)
                    .if_not_exists()
                    .col(pk_auto(Enrollment::EnrollmentId))
                    .col(integer(Enrollment::StudentId))
                    .col(integer(Enrollment::CourseId))
                    .col(date(Enrollment::EnrollmentDate))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-enrollments-student_id")
                            .from(Enrollment::Table, Enrollment::StudentId)
                            .to(User::Table, User::UserId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    // Blocks course deletion while enrollments exist.
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-enrollments-course_id")
                            .from(Enrollment::Table, Enrollment::CourseId)
                            .to(Course::Table, Course::CourseId)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // A student enrolls in a course at most once.
        manager
            .create_index(
                Index::create()
                    .name("uq_enrollments_student_course")
                    .table(Enrollment::Table)
                    .col(Enrollment::StudentId)
                    .col(Enrollment::CourseId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AssessmentComponent::Table)
                    .if_not_exists()
                    .col(pk_auto(AssessmentComponent::ComponentId))
                    .col(integer(AssessmentComponent::CourseId))
                    .col(string_len(AssessmentComponent::ComponentName, 100))
                    .col(
                        double(AssessmentComponent::MaxMark)
                            .check(Expr::col(AssessmentComponent::MaxMark).gt(0)),
                    )
                    .col(
                        double(AssessmentComponent::WeightPercentage)
                            .check(Expr::col(AssessmentComponent::WeightPercentage).gte(0))
                            .check(Expr::col(AssessmentComponent::WeightPercentage).lte(100)),
                    )
                    .col(boolean(AssessmentComponent::IsFinalExam).default(false))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-assessment_components-course_id")
                            .from(AssessmentComponent::Table, AssessmentComponent::CourseId)
                            .to(Course::Table, Course::CourseId)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_assessment_components_course_id")
                    .table(AssessmentComponent::Table)
                    .col(AssessmentComponent::CourseId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StudentMark::Table)
                    .if_not_exists()
                    .col(pk_auto(StudentMark::MarkId))
                    .col(integer(StudentMark::EnrollmentId))
                    .col(integer(StudentMark::ComponentId))
                    .col(
                        double(StudentMark::MarkObtained)
                            .check(Expr::col(StudentMark::MarkObtained).gte(0)),
                    )
                    .col(integer(StudentMark::RecordedBy))
                    .col(timestamp(StudentMark::RecordedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-student_marks-enrollment_id")
                            .from(StudentMark::Table, StudentMark::EnrollmentId)
                            .to(Enrollment::Table, Enrollment::EnrollmentId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-student_marks-component_id")
                            .from(StudentMark::Table, StudentMark::ComponentId)
                            .to(AssessmentComponent::Table, AssessmentComponent::ComponentId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-student_marks-recorded_by")
                            .from(StudentMark::Table, StudentMark::RecordedBy)
                            .to(User::Table, User::UserId)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one mark per enrollment/component pair.
        manager
            .create_index(
                Index::create()
                    .name("uq_student_marks_enrollment_component")
                    .table(StudentMark::Table)
                    .col(StudentMark::EnrollmentId)
                    .col(StudentMark::ComponentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RemarkRequest::Table)
                    .if_not_exists()
                    .col(pk_auto(RemarkRequest::RequestId))
                    // Unique: one remark request per mark, enforced by the store
                    // so concurrent submissions cannot slip past a check-then-insert.
                    .col(integer_uniq(RemarkRequest::MarkId))
                    .col(integer(RemarkRequest::StudentId))
                    .col(text(RemarkRequest::Justification))
                    .col(
                        string_len(RemarkRequest::Status, 20)
                            .default("pending")
                            .check(
                                Expr::col(RemarkRequest::Status)
                                    .is_in(["pending", "approved", "rejected"]),
                            ),
                    )
                    .col(text_null(RemarkRequest::LecturerNotes))
                    .col(integer_null(RemarkRequest::ResolvedBy))
                    .col(timestamp_null(RemarkRequest::ResolvedAt))
                    .col(timestamp(RemarkRequest::CreatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-remark_requests-mark_id")
                            .from(RemarkRequest::Table, RemarkRequest::MarkId)
                            .to(StudentMark::Table, StudentMark::MarkId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-remark_requests-student_id")
                            .from(RemarkRequest::Table, RemarkRequest::StudentId)
                            .to(User::Table, User::UserId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AdvisorStudent::Table)
                    .if_not_exists()
                    .col(pk_auto(AdvisorStudent::AdvisorStudentId))
                    .col(integer(AdvisorStudent::AdvisorId))
                    // Unique: one advisor per student.
                    .col(integer_uniq(AdvisorStudent::StudentId))
                    .col(timestamp(AdvisorStudent::AssignedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-advisor_student-advisor_id")
                            .from(AdvisorStudent::Table, AdvisorStudent::AdvisorId)
                            .to(User::Table, User::UserId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-advisor_student-student_id")
                            .from(AdvisorStudent::Table, AdvisorStudent::StudentId)
                            .to(User::Table, User::UserId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AdvisorNote::Table)
                    .if_not_exists()
                    .col(pk_auto(AdvisorNote::NoteId))
                    .col(integer(AdvisorNote::AdvisorStudentId))
                    .col(text(AdvisorNote::NoteContent))
                    .col(date(AdvisorNote::MeetingDate))
                    // JSON array of recommendation strings.
                    .col(text(AdvisorNote::Recommendations).default("[]"))
                    .col(boolean(AdvisorNote::FollowUpRequired).default(false))
                    .col(timestamp(AdvisorNote::CreatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-advisor_notes-advisor_student_id")
                            .from(AdvisorNote::Table, AdvisorNote::AdvisorStudentId)
                            .to(AdvisorStudent::Table, AdvisorStudent::AdvisorStudentId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Notification::Table)
                    .if_not_exists()
                    .col(pk_auto(Notification::NotificationId))
                    .col(integer(Notification::UserId))
                    .col(string_len(Notification::Title, 150))
                    .col(text(Notification::Message))
                    .col(string_len_null(Notification::Type, 50))
                    .col(integer_null(Notification::RelatedId))
                    .col(boolean(Notification::IsRead).default(false))
                    .col(timestamp(Notification::CreatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-notifications-user_id")
                            .from(Notification::Table, Notification::UserId)
                            .to(User::Table, User::UserId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_user_id")
                    .table(Notification::Table)
                    .col(Notification::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_created_at")
                    .table(Notification::Table)
                    .col(Notification::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Notification::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AdvisorNote::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AdvisorStudent::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RemarkRequest::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StudentMark::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AssessmentComponent::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Enrollment::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Course::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum User {
    #[sea_orm(iden = "users")]
    Table,
    UserId,
    Username,
    PasswordHash,
    Role,
    Email,
    FullName,
    MatricNumber,
    Pin,
    ProfilePicture,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Course {
    #[sea_orm(iden = "courses")]
    Table,
    CourseId,
    CourseCode,
    CourseName,
    LecturerId,
    CreditHours,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Enrollment {
    #[sea_orm(iden = "enrollments")]
    Table,
    EnrollmentId,
    StudentId,
    CourseId,
    EnrollmentDate,
}

#[derive(DeriveIden)]
enum AssessmentComponent {
    #[sea_orm(iden = "assessment_components")]
    Table,
    ComponentId,
    CourseId,
    ComponentName,
    MaxMark,
    WeightPercentage,
    IsFinalExam,
}

#[derive(DeriveIden)]
enum StudentMark {
    #[sea_orm(iden = "student_marks")]
    Table,
    MarkId,
    EnrollmentId,
    ComponentId,
    MarkObtained,
    RecordedBy,
    RecordedAt,
}

#[derive(DeriveIden)]
enum RemarkRequest {
    #[sea_orm(iden = "remark_requests")]
    Table,
    RequestId,
    MarkId,
    StudentId,
    Justification,
    Status,
    LecturerNotes,
    ResolvedBy,
    ResolvedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AdvisorStudent {
    #[sea_orm(iden = "advisor_student")]
    Table,
    AdvisorStudentId,
    AdvisorId,
    StudentId,
    AssignedAt,
}

#[derive(DeriveIden)]
enum AdvisorNote {
    #[sea_orm(iden = "advisor_notes")]
    Table,
    NoteId,
    AdvisorStudentId,
    NoteContent,
    MeetingDate,
    Recommendations,
    FollowUpRequired,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Notification {
    #[sea_orm(iden = "notifications")]
    Table,
    NotificationId,
    UserId,
    Title,
    Message,
    Type,
    RelatedId,
    IsRead,
    CreatedAt,
}
