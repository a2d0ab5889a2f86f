use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecipientSource {
    /// Literal list of destinations stored on the job.
    #[sea_orm(string_value = "static_list")]
    StaticList,
    /// Key-value predicate evaluated against the recipient cache at run time.
    #[sea_orm(string_value = "filter")]
    Filter,
}
