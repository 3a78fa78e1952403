use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "medications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    #[sea_orm(column_type = "Text")]
    pub instructions: String,
    pub start_date: DateTimeUtc,
    pub end_date: Option<DateTimeUtc>,
    /// NORMAL | HIGH
    pub priority: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
