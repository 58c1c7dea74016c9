//! `SeaORM` Entity for transaction_group_members table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transaction_group_members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub group_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub transaction_id: Uuid,
    pub joined_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transaction_groups::Entity",
        from = "Column::GroupId",
        to = "super::transaction_groups::Column::Id"
    )]
    TransactionGroups,
}

impl Related<super::transaction_groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionGroups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
