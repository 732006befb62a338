use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims issued by the identity provider. The service only consumes
/// tokens; it never mints them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}
