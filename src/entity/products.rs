use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub category_id: Option<i64>,
    pub price_cents: i64,
    pub description: String,
    /// Comma-separated variant axes, split at the API edge.
    pub colors: String,
    pub sizes: String,
    pub image_1: Option<String>,
    pub image_2: Option<String>,
    pub image_3: Option<String>,
    pub image_4: Option<String>,
    pub image_5: Option<String>,
    pub latest_arrival: bool,
    /// Derived from product_stock; written only by the inventory ledger.
    pub stock_status: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id"
    )]
    Categories,
    #[sea_orm(has_many = "super::product_stock::Entity")]
    ProductStock,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl Related<super::product_stock::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductStock.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
