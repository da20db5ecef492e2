use sea_orm::entity::prelude::*;

// Integer ids are part of the wire contract: cart keys are
// `"{product_id}-{size}"` strings split at the first dash.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub image: Option<String>,
    pub category: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub new_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub old_price: Decimal,
    pub available: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
