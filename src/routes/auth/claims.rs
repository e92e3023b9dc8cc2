use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Claims {
    pub id: String, // stable UUID derived from the normalized email
    pub email: String,
    pub name: String,
    pub exp: usize, // expiration (as UNIX timestamp)
    // Optional fields
    pub plan: Option<String>,
    pub iss: String,
    pub aud: String,
}
