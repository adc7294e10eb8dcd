use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "advisor_student")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub advisor_student_id: i32,
    pub advisor_id: i32,
    pub student_id: i32,
    pub assigned_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AdvisorId",
        to = "super::user::Column::UserId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Advisor,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::StudentId",
        to = "super::user::Column::UserId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Student,
    #[sea_orm(has_many = "super::advisor_note::Entity")]
    AdvisorNote,
}

impl Related<super::advisor_note::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AdvisorNote.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
