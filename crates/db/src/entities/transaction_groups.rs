//! `SeaORM` Entity for transaction_groups table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transaction_groups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transaction_group_members::Entity")]
    TransactionGroupMembers,
}

impl Related<super::transaction_group_members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionGroupMembers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
