use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "assessment_components")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub component_id: i32,
    pub course_id: i32,
    pub component_name: String,
    pub max_mark: f64,
    pub weight_percentage: f64,
    pub is_final_exam: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::CourseId",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Course,
    #[sea_orm(has_many = "super::student_mark::Entity")]
    StudentMark,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl Related<super::student_mark::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudentMark.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
