use most_read::auth::{sign_admin_token, sign_session_token};
use most_read::config::Config;

pub fn admin_header(config: &Config) -> (&'static str, String) {
    let token = sign_admin_token("host-integration", &config.admin_jwt_secret, 1)
        .expect("sign admin token");
    ("authorization", format!("Bearer {token}"))
}

pub fn session_header(config: &Config, user_id: &str, caps: &[&str]) -> (&'static str, String) {
    let caps: Vec<String> = caps.iter().map(|c| c.to_string()).collect();
    let token = sign_session_token(user_id, &caps, &config.session_jwt_secret, 1)
        .expect("sign session token");
    ("authorization", format!("Bearer {token}"))
}
