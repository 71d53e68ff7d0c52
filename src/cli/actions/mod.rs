pub mod hash;
pub mod server;

use secrecy::SecretString;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: Option<String>,
        jwt_secret: Option<SecretString>,
        password_hash: Option<String>,
        password: Option<SecretString>,
        frontend_url: String,
    },
    Hash {
        password: SecretString,
        iterations: u32,
    },
}
