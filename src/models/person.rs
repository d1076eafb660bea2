#[derive(sqlx::FromRow, serde::Serialize, Debug, Clone, PartialEq)]
pub struct Person {
    pub id: i64,
    pub client_id: i64,
    pub name: String,
    pub email: String,
}
