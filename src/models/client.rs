#[derive(sqlx::FromRow, serde::Serialize, Debug, Clone, PartialEq)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub account_key: String,
}
