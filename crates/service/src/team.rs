use models::{person, team};
use serde::{Deserialize, Serialize};

use crate::generic::GenericService;
use crate::mapping::TypeMap;
use crate::predicate::Field;
use crate::repository::{IncludeMany, SeaOrmRepository, StorageEntity};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamDto {
    pub id: i32,
    pub name: String,
    /// Member names, filled when members were eagerly loaded.
    #[serde(default)]
    pub members: Vec<String>,
}

impl TeamDto {
    pub const ID: Field<TeamDto> = Field::new("id");
    pub const NAME: Field<TeamDto> = Field::new("name");
    pub const MEMBERS: Field<TeamDto> = Field::new("members");

    pub fn new(name: &str) -> Self {
        Self { id: 0, name: name.to_string(), members: Vec::new() }
    }
}

impl StorageEntity for team::Entity {
    fn id_column() -> team::Column {
        team::Column::Id
    }
}

fn member_names(row: &team::Model, dto: &mut TeamDto) {
    dto.members = row.members.iter().map(|p| p.full_name.clone()).collect();
}

pub fn team_map() -> TypeMap<team::Model, TeamDto> {
    TypeMap::new().same(&["id", "name"]).after_to_dto(member_names)
}

pub fn include_members() -> IncludeMany<team::Entity, person::Entity> {
    IncludeMany::new("members", |t: &mut team::Model, people| t.members = people)
}

pub type TeamService<R = SeaOrmRepository<team::Entity>> = GenericService<team::Entity, TeamDto, R>;
