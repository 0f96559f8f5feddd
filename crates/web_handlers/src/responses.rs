use actix_web::{HttpRequest, HttpResponse, http::header};
use campgrounds::{CampgroundError, Flash};
use maud::Markup;

use crate::flash::{FLASH_COOKIE, clear_flash_cookie, flash_cookie};

/// Where failed requests go when the referrer is unknown.
pub const FALLBACK_PATH: &str = "/campgrounds";

/// Renders a page, dropping any flash it has just displayed.
pub fn html(req: &HttpRequest, markup: Markup) -> HttpResponse {
    let mut response = HttpResponse::Ok();
    response.content_type("text/html; charset=utf-8");
    if req.cookie(FLASH_COOKIE).is_some() {
        response.cookie(clear_flash_cookie());
    }
    response.body(markup.into_string())
}

/// Redirects to `location`, carrying `flash` to the next page.
pub fn redirect(location: &str, flash: &Flash) -> HttpResponse {
    let mut response = HttpResponse::SeeOther();
    response.insert_header((header::LOCATION, location));
    if !flash.is_empty() {
        response.cookie(flash_cookie(flash));
    }
    response.finish()
}

/// The referring page, or `fallback` when there is none or it belongs to
/// another site. Only local paths are ever returned.
pub fn back(req: &HttpRequest, fallback: &str) -> String {
    req.headers()
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|referer| local_path(referer, req.connection_info().host()))
        .unwrap_or_else(|| fallback.to_string())
}

/// Rooted path that browsers will not read as another host.
fn is_rooted_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\")
}

/// `referer` as a path on `host`, if it points there.
fn local_path(referer: &str, host: &str) -> Option<String> {
    if referer.starts_with('/') {
        return is_rooted_path(referer).then(|| referer.to_string());
    }

    let rest = referer
        .strip_prefix("https://")
        .or_else(|| referer.strip_prefix("http://"))?;
    let (authority, path) = match rest.find(['/', '?', '#']) {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };

    if !authority.eq_ignore_ascii_case(host) {
        return None;
    }
    match path {
        "" => Some("/".to_string()),
        p if is_rooted_path(p) => Some(p.to_string()),
        p if p.starts_with('/') => None,
        p => Some(format!("/{}", p)),
    }
}

/// Turns a workflow error into an error banner and a redirect to a safe page.
pub fn fail(req: &HttpRequest, mut flash: Flash, error: &CampgroundError) -> HttpResponse {
    flash.error(error.user_message());
    let location = match error {
        CampgroundError::Unauthenticated => "/login".to_string(),
        _ => back(req, FALLBACK_PATH),
    };
    redirect(&location, &flash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn back_prefers_referer() {
        let req = TestRequest::default()
            .insert_header((header::REFERER, "/campgrounds/new"))
            .to_http_request();
        assert_eq!(back(&req, FALLBACK_PATH), "/campgrounds/new");

        let req = TestRequest::default().to_http_request();
        assert_eq!(back(&req, FALLBACK_PATH), "/campgrounds");
    }

    #[test]
    fn back_ignores_other_sites() {
        let back_from = |referer: &str| {
            let req = TestRequest::default()
                .insert_header((header::HOST, "camp.test"))
                .insert_header((header::REFERER, referer))
                .to_http_request();
            back(&req, FALLBACK_PATH)
        };

        assert_eq!(back_from("https://evil.example/phish"), "/campgrounds");
        assert_eq!(back_from("//evil.example/phish"), "/campgrounds");
        assert_eq!(back_from("/\\evil.example/phish"), "/campgrounds");
        assert_eq!(back_from("javascript:alert(1)"), "/campgrounds");
        assert_eq!(back_from("http://camp.test//evil.example"), "/campgrounds");
        assert_eq!(
            back_from("http://camp.test/campgrounds/new?x=1"),
            "/campgrounds/new?x=1"
        );
        assert_eq!(back_from("https://camp.test"), "/");
    }

    #[test]
    fn unauthenticated_failures_go_to_login() {
        let req = TestRequest::default()
            .insert_header((header::REFERER, "/campgrounds"))
            .to_http_request();
        let response = fail(&req, Flash::default(), &CampgroundError::Unauthenticated);

        assert_eq!(response.status(), actix_web::http::StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login");
        assert!(response.cookies().any(|c| c.name() == FLASH_COOKIE));
    }
}
