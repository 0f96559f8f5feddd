use actix_web::{guard, web};

use crate::auth_handlers::*;
use crate::campground_handlers::*;

/// Matches a POST carrying `_method=<method>` in its query string, the way
/// HTML forms ask for PUT and DELETE.
pub fn method_override(method: &'static str) -> impl guard::Guard {
    guard::fn_guard(move |ctx| {
        ctx.head().uri.query().is_some_and(|query| {
            query.split('&').any(|pair| match pair.split_once('=') {
                Some(("_method", value)) => value.eq_ignore_ascii_case(method),
                _ => false,
            })
        })
    })
}

/// Registers every page and form route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(landing))
        .service(
            web::resource("/register")
                .route(web::get().to(register_form))
                .route(web::post().to(register)),
        )
        .service(
            web::resource("/login")
                .route(web::get().to(login_form))
                .route(web::post().to(login)),
        )
        .route("/logout", web::get().to(logout))
        .service(
            web::scope("/campgrounds")
                .service(
                    web::resource("")
                        .route(web::get().to(index))
                        .route(web::post().to(create)),
                )
                .route("/new", web::get().to(new_form))
                .service(
                    web::resource("/{id}")
                        .route(web::get().to(show))
                        .route(web::put().to(update))
                        .route(web::delete().to(destroy))
                        .route(web::post().guard(method_override("PUT")).to(update))
                        .route(web::post().guard(method_override("DELETE")).to(destroy)),
                )
                .route("/{id}/edit", web::get().to(edit_form)),
        );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::cookie::Cookie;
    use actix_web::http::{StatusCode, header};
    use actix_web::{App, test};
    use auth_services::jwt::JwtService;
    use auth_services::middleware::{AUTH_COOKIE, AuthMiddleware};
    use auth_services::types::Principal;
    use campgrounds::testing::*;
    use campgrounds::{ListingService, NO_MATCH_MESSAGE};
    use uuid::Uuid;

    use super::*;

    const BOUNDARY: &str = "yelpcamp-test-boundary";

    struct Harness {
        service: ListingService,
        repository: Arc<InMemoryListingRepository>,
        images: Arc<RecordingImageStore>,
        jwt: JwtService,
    }

    fn harness() -> Harness {
        let repository = Arc::new(InMemoryListingRepository::new());
        let images = Arc::new(RecordingImageStore::new());
        let geocoder = Arc::new(StubGeocoder::resolving(
            "Yosemite Valley, CA, USA",
            37.7456,
            -119.5936,
        ));
        Harness {
            service: ListingService::new(repository.clone(), geocoder, images.clone()),
            repository,
            images,
            jwt: JwtService::new("test-secret"),
        }
    }

    fn principal(username: &str) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            username: username.to_string(),
        }
    }

    fn session(jwt: &JwtService, principal: &Principal) -> Cookie<'static> {
        Cookie::new(AUTH_COOKIE, jwt.generate_token(principal).unwrap())
    }

    fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((filename, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn listing_fields() -> Vec<(&'static str, &'static str)> {
        vec![
            ("campground[name]", "Granite Hill"),
            ("campground[description]", "Quiet spot by the river"),
            ("campground[location]", "Yosemite"),
        ]
    }

    macro_rules! app {
        ($harness:expr) => {
            test::init_service(
                App::new()
                    .wrap(AuthMiddleware::new($harness.jwt.clone()))
                    .app_data(web::Data::new($harness.service.clone()))
                    .configure(configure),
            )
            .await
        };
    }

    fn location<B>(response: &actix_web::dev::ServiceResponse<B>) -> String {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    #[actix_web::test]
    async fn method_override_reads_the_query() {
        let guard = method_override("DELETE");
        let req = test::TestRequest::post()
            .uri("/campgrounds/1?_method=DELETE")
            .to_srv_request();
        assert!(guard::Guard::check(&guard, &req.guard_ctx()));

        let req = test::TestRequest::post()
            .uri("/campgrounds/1?_method=PUT")
            .to_srv_request();
        assert!(!guard::Guard::check(&guard, &req.guard_ctx()));

        let req = test::TestRequest::post().uri("/campgrounds/1").to_srv_request();
        assert!(!guard::Guard::check(&guard, &req.guard_ctx()));
    }

    #[actix_web::test]
    async fn index_renders_listings() {
        let h = harness();
        let owner = principal("ranger");
        h.repository.insert(sample_listing("Granite Hill", &owner)).await;
        let app = app!(h);

        let response = test::call_service(&app, test::TestRequest::get().uri("/campgrounds").to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = String::from_utf8(test::read_body(response).await.to_vec()).unwrap();
        assert!(body.contains("Granite Hill"));
        assert!(!body.contains(NO_MATCH_MESSAGE));
    }

    #[actix_web::test]
    async fn search_without_match_says_so() {
        let h = harness();
        let owner = principal("ranger");
        h.repository.insert(sample_listing("Granite Hill", &owner)).await;
        let app = app!(h);

        let response = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/campgrounds?search=salmon")
                .to_request(),
        )
        .await;
        let body = String::from_utf8(test::read_body(response).await.to_vec()).unwrap();
        assert!(body.contains(NO_MATCH_MESSAGE));
    }

    #[actix_web::test]
    async fn anonymous_visitors_are_sent_to_login() {
        let h = harness();
        let app = app!(h);

        let response = test::call_service(&app, test::TestRequest::get().uri("/campgrounds/new").to_request()).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
    }

    #[actix_web::test]
    async fn create_uploads_and_redirects_to_the_listing() {
        let h = harness();
        let author = principal("ranger");
        let cookie = session(&h.jwt, &author);
        let app = app!(h);

        let body = multipart_body(&listing_fields(), Some(("tent.jpg", b"not really a jpeg")));
        let response = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/campgrounds")
                .cookie(cookie)
                .insert_header((
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                ))
                .set_payload(body)
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(location(&response).starts_with("/campgrounds/"));
        assert_eq!(h.repository.len().await, 1);

        let uploads = h.images.uploads();
        assert_eq!(uploads.len(), 1);
        assert!(!uploads[0].exists(), "temp upload should be removed");
    }

    #[actix_web::test]
    async fn create_rejects_non_images() {
        let h = harness();
        let author = principal("ranger");
        let cookie = session(&h.jwt, &author);
        let app = app!(h);

        let body = multipart_body(&listing_fields(), Some(("notes.txt", b"hello")));
        let response = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/campgrounds")
                .cookie(cookie)
                .insert_header((header::REFERER, "/campgrounds/new"))
                .insert_header((
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                ))
                .set_payload(body)
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/campgrounds/new");
        assert_eq!(h.repository.len().await, 0);
        assert!(h.images.uploads().is_empty());
    }

    #[actix_web::test]
    async fn owner_can_delete_through_method_override() {
        let h = harness();
        let owner = principal("ranger");
        let listing = sample_listing("Granite Hill", &owner);
        let handle = listing.image.clone().unwrap().deletion_handle;
        h.repository.insert(listing.clone()).await;
        let cookie = session(&h.jwt, &owner);
        let app = app!(h);

        let response = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&format!("/campgrounds/{}?_method=DELETE", listing.id))
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/campgrounds");
        assert!(h.repository.snapshot(listing.id).await.is_none());
        assert_eq!(h.images.deletes(), vec![handle]);
    }

    #[actix_web::test]
    async fn strangers_cannot_delete() {
        let h = harness();
        let owner = principal("ranger");
        let stranger = principal("visitor");
        let listing = sample_listing("Granite Hill", &owner);
        h.repository.insert(listing.clone()).await;
        let cookie = session(&h.jwt, &stranger);
        let app = app!(h);

        let response = test::call_service(
            &app,
            test::TestRequest::delete()
                .uri(&format!("/campgrounds/{}", listing.id))
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(h.repository.snapshot(listing.id).await.is_some());
        assert!(h.images.deletes().is_empty());
    }

    #[actix_web::test]
    async fn show_offers_controls_to_the_owner_only() {
        let h = harness();
        let owner = principal("ranger");
        let listing = sample_listing("Granite Hill", &owner);
        h.repository.insert(listing.clone()).await;
        let owner_cookie = session(&h.jwt, &owner);
        let app = app!(h);
        let uri = format!("/campgrounds/{}", listing.id);

        let response = test::call_service(
            &app,
            test::TestRequest::get().uri(&uri).cookie(owner_cookie).to_request(),
        )
        .await;
        let body = String::from_utf8(test::read_body(response).await.to_vec()).unwrap();
        assert!(body.contains("_method=DELETE"));

        let response = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        let body = String::from_utf8(test::read_body(response).await.to_vec()).unwrap();
        assert!(body.contains("Granite Hill"));
        assert!(!body.contains("_method=DELETE"));
    }

    #[actix_web::test]
    async fn malformed_ids_are_not_found() {
        let h = harness();
        let app = app!(h);

        let response = test::call_service(
            &app,
            test::TestRequest::get().uri("/campgrounds/not-a-uuid").to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/campgrounds");
        assert!(
            response
                .response()
                .cookies()
                .any(|c| c.name() == crate::flash::FLASH_COOKIE)
        );
    }
}
