use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "remark_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub request_id: i32,
    pub mark_id: i32,
    pub student_id: i32,
    pub justification: String,
    pub status: String,
    pub lecturer_notes: Option<String>,
    pub resolved_by: Option<i32>,
    pub resolved_at: Option<DateTime>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::student_mark::Entity",
        from = "Column::MarkId",
        to = "super::student_mark::Column::MarkId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    StudentMark,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::StudentId",
        to = "super::user::Column::UserId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Student,
}

impl Related<super::student_mark::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudentMark.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
