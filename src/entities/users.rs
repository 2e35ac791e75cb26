use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub email: String,

    pub name: Option<String>,

    pub phone: Option<String>,

    /// `user` or `admin`
    pub role: String,

    /// Argon2id hash; absent until the OTP flow completes
    pub password_hash: Option<String>,

    pub otp_code: Option<String>,

    /// RFC 3339; a new OTP request overwrites both fields
    pub otp_expires_at: Option<String>,

    pub reset_token: Option<String>,

    pub reset_expires_at: Option<String>,

    pub is_email_verified: bool,

    pub address_line1: Option<String>,

    pub address_line2: Option<String>,

    pub city: Option<String>,

    pub state: Option<String>,

    pub postal_code: Option<String>,

    pub country: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cart_items::Entity")]
    CartItems,
    #[sea_orm(has_many = "super::orders::Entity")]
    Orders,
}

impl Related<super::cart_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItems.def()
    }
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
