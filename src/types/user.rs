pub type Username = String;

pub const ADMIN_CLAIM: &str = "admin";

#[derive(Clone, Debug)]
pub struct AuthorizedUser {
    pub id: i32,
    pub username: Username,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub claims: Vec<String>,
}

impl AuthorizedUser {
    pub fn is_admin(&self) -> bool {
        self.claims.iter().any(|claim| claim == ADMIN_CLAIM)
    }
}
