use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "advisor_notes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub note_id: i32,
    pub advisor_student_id: i32,
    pub note_content: String,
    pub meeting_date: Date,
    /// JSON array of recommendation strings, stored as text.
    pub recommendations: String,
    pub follow_up_required: bool,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::advisor_student::Entity",
        from = "Column::AdvisorStudentId",
        to = "super::advisor_student::Column::AdvisorStudentId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    AdvisorStudent,
}

impl Related<super::advisor_student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AdvisorStudent.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
