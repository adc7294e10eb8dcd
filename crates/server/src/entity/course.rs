use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub course_id: i32,
    pub course_code: String,
    pub course_name: String,
    pub lecturer_id: i32,
    pub credit_hours: i16,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::LecturerId",
        to = "super::user::Column::UserId",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Lecturer,
    #[sea_orm(has_many = "super::enrollment::Entity")]
    Enrollment,
    #[sea_orm(has_many = "super::assessment_component::Entity")]
    AssessmentComponent,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lecturer.def()
    }
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollment.def()
    }
}

impl Related<super::assessment_component::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AssessmentComponent.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
