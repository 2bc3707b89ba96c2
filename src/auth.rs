use crate::db::repositories as db;
use crate::error::{AuthError, is_unique_violation};
use crate::startup::AppState;
use axum::{
    Form,
    extract::Extension,
    response::Redirect,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{info, warn};

const USER_KEY: &str = "user";
const FLASH_KEY: &str = "flash";

/// The logged-in user as stored in the session cookie store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: String,
}

impl SessionUser {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flash {
    pub kind: String,
    pub message: String,
}

pub async fn set_flash(session: &Session, kind: &str, message: &str) {
    let flash = Flash {
        kind: kind.to_string(),
        message: message.to_string(),
    };
    if let Err(e) = session.insert(FLASH_KEY, flash).await {
        warn!("failed to store flash message: {}", e);
    }
}

/// One-shot: reading a flash message clears it.
pub async fn take_flash(session: &Session) -> Option<Flash> {
    session.remove::<Flash>(FLASH_KEY).await.ok().flatten()
}

pub async fn current_user(session: &Session) -> Option<SessionUser> {
    session.get::<SessionUser>(USER_KEY).await.ok().flatten()
}

pub async fn require_user(session: &Session) -> Result<SessionUser, AuthError> {
    current_user(session).await.ok_or(AuthError::Unauthorized)
}

pub async fn require_admin(session: &Session) -> Result<SessionUser, AuthError> {
    let user = require_user(session).await?;
    if !user.is_admin() {
        return Err(AuthError::Forbidden);
    }
    Ok(user)
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

pub async fn register(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Redirect {
    if form.username.is_empty() || form.password.is_empty() || form.email.is_empty() {
        set_flash(&session, "error", "All fields are required").await;
        return Redirect::to("/register");
    }

    if let Ok(Some(enabled)) = db::get_setting(&app_state.db, "registration_enabled").await {
        if enabled == "false" {
            set_flash(&session, "error", "Registration is currently disabled").await;
            return Redirect::to("/register");
        }
    }

    let hashed = match bcrypt::hash(&form.password, bcrypt::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(e) => {
            warn!("password hashing failed: {}", e);
            set_flash(&session, "error", "Registration failed").await;
            return Redirect::to("/register");
        }
    };

    match db::create_user(&app_state.db, &form.username, &hashed, &form.email).await {
        Ok(user_id) => {
            info!("registered user {} (id {})", form.username, user_id);
            set_flash(&session, "success", "Registration successful! Please login.").await;
            Redirect::to("/login")
        }
        Err(e) if is_unique_violation(&e) => {
            set_flash(&session, "error", "Username or email already exists").await;
            Redirect::to("/register")
        }
        Err(e) => {
            warn!("registration insert failed: {}", e);
            set_flash(&session, "error", "Registration failed").await;
            Redirect::to("/register")
        }
    }
}

pub async fn login(
    Extension(app_state): Extension<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Redirect {
    let user = match db::find_user_by_username(&app_state.db, &form.username).await {
        Ok(user) => user,
        Err(e) => {
            warn!("login lookup failed: {}", e);
            set_flash(&session, "error", "Database error").await;
            return Redirect::to("/login");
        }
    };

    let user = match user {
        Some(user)
            if user.is_active
                && bcrypt::verify(&form.password, &user.password_hash).unwrap_or(false) =>
        {
            user
        }
        _ => {
            set_flash(&session, "error", "Invalid username or password").await;
            return Redirect::to("/login");
        }
    };

    let session_user = SessionUser {
        id: user.id,
        username: user.username,
        email: user.email,
        role: user.role,
    };
    if let Err(e) = session.insert(USER_KEY, session_user).await {
        warn!("failed to store session: {}", e);
        set_flash(&session, "error", "Login failed").await;
        return Redirect::to("/login");
    }

    if let Err(e) = db::record_login(&app_state.db, user.id).await {
        warn!("failed to record login for user {}: {}", user.id, e);
    }

    Redirect::to("/")
}

pub async fn logout(session: Session) -> Redirect {
    if let Err(e) = session.flush().await {
        warn!("failed to flush session: {}", e);
    }
    Redirect::to("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_role_is_recognized() {
        let admin = SessionUser {
            id: 1,
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            role: "admin".to_string(),
        };
        assert!(admin.is_admin());
    }

    #[test]
    fn plain_user_is_not_admin() {
        let user = SessionUser {
            id: 2,
            username: "user".to_string(),
            email: "user@example.com".to_string(),
            role: "user".to_string(),
        };
        assert!(!user.is_admin());
    }
}
