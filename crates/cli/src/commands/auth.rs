//! Session commands: login, register, logout, whoami.

use sweet_shop_client::{ApiError, Registration, SessionManager};
use sweet_shop_core::Email;

/// Log in and report the established session.
pub async fn login(
    session: &SessionManager,
    email: &Email,
    password: &str,
) -> Result<(), ApiError> {
    let view = session.login(email, password).await?;
    let role = if view.admin { "admin" } else { "customer" };
    println!("Logged in as {email} ({role})");
    Ok(())
}

/// Register a new account. Does not log in; prompt the user to do so.
pub async fn register(
    session: &SessionManager,
    name: String,
    email: Email,
    password: String,
) -> Result<(), ApiError> {
    session
        .register(&Registration {
            name,
            email: email.clone(),
            password,
        })
        .await?;
    println!("Registered {email}. Run `sweet-shop login` to start a session.");
    Ok(())
}

/// Drop the persisted session.
pub fn logout(session: &SessionManager) -> Result<(), ApiError> {
    session.logout()?;
    println!("Logged out");
    Ok(())
}

/// Print the current session without touching the network.
pub fn whoami(session: &SessionManager) {
    let view = session.current_session();
    match view.user {
        Some(user) if view.authenticated => {
            let role = if view.admin { "admin" } else { "customer" };
            let name = user.name.as_deref().unwrap_or("-");
            println!("{} ({name}, {role})", user.email);
        }
        _ if view.authenticated => println!("Logged in (profile unavailable)"),
        _ => println!("Not logged in"),
    }
}
