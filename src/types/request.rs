use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize)]
pub struct LoginData {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Serialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
}
