//! Application mapping registry.

use crate::mapping::{MappingConfig, MappingError};
use crate::person::person_map;
use crate::team::team_map;

/// Build once at startup and share behind an `Arc`.
pub fn mapping_config() -> Result<MappingConfig, MappingError> {
    Ok(MappingConfig::builder().register(person_map())?.register(team_map())?.build())
}
