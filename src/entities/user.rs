use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::rating::Entity")]
    Rating,
    #[sea_orm(has_many = "super::like_review::Entity")]
    LikeReview,
    #[sea_orm(has_many = "super::watch_list::Entity")]
    WatchList,
}

impl Related<super::rating::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rating.def()
    }
}

impl Related<super::like_review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LikeReview.def()
    }
}

impl Related<super::watch_list::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WatchList.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
