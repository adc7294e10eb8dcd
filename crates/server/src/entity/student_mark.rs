use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "student_marks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub mark_id: i32,
    pub enrollment_id: i32,
    pub component_id: i32,
    pub mark_obtained: f64,
    pub recorded_by: i32,
    pub recorded_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::enrollment::Entity",
        from = "Column::EnrollmentId",
        to = "super::enrollment::Column::EnrollmentId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Enrollment,
    #[sea_orm(
        belongs_to = "super::assessment_component::Entity",
        from = "Column::ComponentId",
        to = "super::assessment_component::Column::ComponentId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    AssessmentComponent,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::RecordedBy",
        to = "super::user::Column::UserId",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    RecordedBy,
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
