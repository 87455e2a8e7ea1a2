use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::team;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "person")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub guid: Uuid,
    pub full_name: String,
    pub birth_year: i32,
    pub team_id: Option<i32>,
    /// Filled only by eager loading.
    #[sea_orm(ignore)]
    #[serde(default)]
    pub team: Option<team::Model>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Team,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self { Relation::Team => Entity::belongs_to(team::Entity).from(Column::TeamId).to(team::Column::Id).into() }
    }
}

impl Related<team::Entity> for Entity {
    fn to() -> RelationDef { Relation::Team.def() }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Fresh unsaved row; `id` is assigned by the backend on insert.
    pub fn new(full_name: &str, birth_year: i32) -> Self {
        Self { id: 0, guid: Uuid::new_v4(), full_name: full_name.to_string(), birth_year, team_id: None, team: None }
    }
}
