use actix_web::cookie::{Cookie, SameSite, time::Duration};
use actix_web::{HttpRequest, HttpResponse, http::header, web};
use validator::Validate;

use auth_services::jwt::{JwtService, SESSION_HOURS};
use auth_services::middleware::{AUTH_COOKIE, CurrentUser};
use auth_services::service::AuthService;
use auth_services::types::*;
use campgrounds::Flash;

use crate::flash::{flash_cookie, read_flash};
use crate::responses::{html, redirect};
use crate::views::{self, Page};

/// Session cookie holding a freshly issued token.
pub fn auth_cookie(token: String) -> Cookie<'static> {
    Cookie::build(AUTH_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::hours(SESSION_HOURS))
        .finish()
}

fn cleared_auth_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(AUTH_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

/// Issues a session for `principal` and sends them to the index.
fn sign_in(jwt: &JwtService, principal: &Principal, welcome: String) -> HttpResponse {
    let mut flash = Flash::default();

    let token = match jwt.generate_token(principal) {
        Ok(token) => token,
        Err(e) => {
            log::error!("❌ Failed to issue session for {}: {}", principal.id, e);
            flash.error(e.user_message());
            return redirect("/login", &flash);
        }
    };

    flash.success(welcome);
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/campgrounds"))
        .cookie(auth_cookie(token))
        .cookie(flash_cookie(&flash))
        .finish()
}

/// `GET /`
pub async fn landing(req: HttpRequest, user: CurrentUser) -> HttpResponse {
    let flash = read_flash(&req);
    let page = Page {
        title: "Welcome",
        user: user.0.as_ref(),
        flash: &flash,
    };
    html(&req, views::auth::landing(&page))
}

/// `GET /register`
pub async fn register_form(req: HttpRequest, user: CurrentUser) -> HttpResponse {
    let flash = read_flash(&req);
    let page = Page {
        title: "Sign Up",
        user: user.0.as_ref(),
        flash: &flash,
    };
    html(&req, views::auth::register(&page))
}

/// `POST /register`: creates the account and logs it in.
pub async fn register(
    auth_service: web::Data<AuthService>,
    jwt_service: web::Data<JwtService>,
    form: web::Form<RegisterRequest>,
) -> HttpResponse {
    let mut flash = Flash::default();

    if let Err(e) = form.validate() {
        flash.error(first_validation_message(&e));
        return redirect("/register", &flash);
    }

    let user = match auth_service.register(&form).await {
        Ok(user) => user,
        Err(e) => {
            log::warn!("⚠️ Registration failed for {}: {}", form.username, e);
            flash.error(e.user_message());
            return redirect("/register", &flash);
        }
    };

    let principal = user.principal();
    sign_in(
        &jwt_service,
        &principal,
        format!("Welcome to YelpCamp {}", principal.username),
    )
}

/// `GET /login`
pub async fn login_form(req: HttpRequest, user: CurrentUser) -> HttpResponse {
    let flash = read_flash(&req);
    let page = Page {
        title: "Login",
        user: user.0.as_ref(),
        flash: &flash,
    };
    html(&req, views::auth::login(&page))
}

/// `POST /login`
pub async fn login(
    auth_service: web::Data<AuthService>,
    jwt_service: web::Data<JwtService>,
    form: web::Form<LoginRequest>,
) -> HttpResponse {
    let mut flash = Flash::default();

    if let Err(e) = form.validate() {
        flash.error(first_validation_message(&e));
        return redirect("/login", &flash);
    }

    match auth_service
        .verify_password(&form.username, &form.password)
        .await
    {
        Ok(user) => {
            let principal = user.principal();
            log::info!("🔑 {} logged in", principal.id);
            sign_in(
                &jwt_service,
                &principal,
                format!("Welcome back {}", principal.username),
            )
        }
        Err(e) => {
            log::info!("Login rejected for {}: {}", form.username, e);
            flash.error(e.user_message());
            redirect("/login", &flash)
        }
    }
}

/// `GET /logout`
pub async fn logout() -> HttpResponse {
    let mut flash = Flash::default();
    flash.success("Logged you out!");

    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/campgrounds"))
        .cookie(cleared_auth_cookie())
        .cookie(flash_cookie(&flash))
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use uuid::Uuid;

    #[test]
    fn session_cookie_is_http_only() {
        let cookie = auth_cookie("token".to_string());
        assert_eq!(cookie.name(), AUTH_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(Duration::hours(SESSION_HOURS)));
    }

    #[test]
    fn sign_in_sets_a_verifiable_token() {
        let jwt = JwtService::new("test-secret");
        let principal = Principal {
            id: Uuid::new_v4(),
            username: "ranger".to_string(),
        };

        let response = sign_in(&jwt, &principal, "Welcome".to_string());

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let token = response
            .cookies()
            .find(|c| c.name() == AUTH_COOKIE)
            .map(|c| c.value().to_string())
            .unwrap();
        assert_eq!(jwt.principal_from_token(&token).unwrap(), principal);
    }

    #[actix_web::test]
    async fn logout_clears_the_session() {
        let response = logout().await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/campgrounds"
        );
        let session = response.cookies().find(|c| c.name() == AUTH_COOKIE).unwrap();
        assert_eq!(session.value(), "");
    }
}
