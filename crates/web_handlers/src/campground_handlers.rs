use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, web};
use auth_services::middleware::CurrentUser;
use campgrounds::guard::require_authenticated;
use campgrounds::{CampgroundError, ListQuery, ListingService, RequestContext};
use uuid::Uuid;

use crate::flash::read_flash;
use crate::responses::{fail, html, redirect};
use crate::upload::read_listing_submission;
use crate::views::{self, Page};

/// Context for a page render: the principal plus any pending flash.
fn page_context(req: &HttpRequest, user: CurrentUser) -> RequestContext {
    let mut ctx = RequestContext::new(user.0);
    ctx.flash = read_flash(req);
    ctx
}

/// Malformed ids can never name a listing.
fn parse_id(raw: &str) -> Result<Uuid, CampgroundError> {
    Uuid::parse_str(raw).map_err(|_| CampgroundError::NotFound)
}

fn listing_path(id: Uuid) -> String {
    format!("/campgrounds/{}", id)
}

/// `GET /campgrounds`: index with optional search and page.
pub async fn index(
    req: HttpRequest,
    user: CurrentUser,
    service: web::Data<ListingService>,
    query: web::Query<ListQuery>,
) -> HttpResponse {
    let mut ctx = page_context(&req, user);

    match service.list(&query).await {
        Ok(index) => {
            let page = Page {
                title: "Campgrounds",
                user: ctx.principal.as_ref(),
                flash: &ctx.flash,
            };
            html(&req, views::campgrounds::index(&page, &index))
        }
        Err(e) => {
            log::error!("❌ Failed to list campgrounds: {}", e);
            ctx.flash.error(e.user_message());
            redirect("/", &ctx.flash)
        }
    }
}

/// `GET /campgrounds/new`
pub async fn new_form(
    req: HttpRequest,
    user: CurrentUser,
    service: web::Data<ListingService>,
) -> HttpResponse {
    let ctx = page_context(&req, user);

    if let Err(e) = service.new_form(&ctx) {
        return fail(&req, ctx.flash, &e);
    }

    let page = Page {
        title: "New Campground",
        user: ctx.principal.as_ref(),
        flash: &ctx.flash,
    };
    html(&req, views::campgrounds::new_form(&page))
}

/// `POST /campgrounds`: multipart create.
pub async fn create(
    req: HttpRequest,
    user: CurrentUser,
    service: web::Data<ListingService>,
    payload: Multipart,
) -> HttpResponse {
    let mut ctx = RequestContext::new(user.0);

    // Nothing is written to disk for anonymous visitors.
    if let Err(e) = require_authenticated(ctx.principal.as_ref()) {
        return fail(&req, ctx.flash, &e);
    }

    let mut submission = match read_listing_submission(payload).await {
        Ok(submission) => submission,
        Err(e) => return fail(&req, ctx.flash, &e),
    };

    let form = std::mem::take(&mut submission.form);
    let result = service
        .create(&mut ctx, form, submission.image.as_ref())
        .await;
    submission.discard_upload().await;

    match result {
        Ok(id) => redirect(&listing_path(id), &ctx.flash),
        Err(e) => fail(&req, ctx.flash, &e),
    }
}

/// `GET /campgrounds/{id}`
pub async fn show(
    req: HttpRequest,
    user: CurrentUser,
    service: web::Data<ListingService>,
    path: web::Path<String>,
) -> HttpResponse {
    let ctx = page_context(&req, user);

    let listing = match parse_id(&path) {
        Ok(id) => service.show(id).await,
        Err(e) => Err(e),
    };

    match listing {
        Ok(listing) => {
            let page = Page {
                title: &listing.name,
                user: ctx.principal.as_ref(),
                flash: &ctx.flash,
            };
            html(&req, views::campgrounds::show(&page, &listing))
        }
        Err(e) => fail(&req, ctx.flash, &e),
    }
}

/// `GET /campgrounds/{id}/edit`: owner only.
pub async fn edit_form(
    req: HttpRequest,
    user: CurrentUser,
    service: web::Data<ListingService>,
    path: web::Path<String>,
) -> HttpResponse {
    let ctx = page_context(&req, user);

    let id = require_authenticated(ctx.principal.as_ref()).and_then(|_| parse_id(&path));
    let listing = match id {
        Ok(id) => service.edit_form(&ctx, id).await,
        Err(e) => Err(e),
    };

    match listing {
        Ok(listing) => {
            let page = Page {
                title: "Edit Campground",
                user: ctx.principal.as_ref(),
                flash: &ctx.flash,
            };
            html(&req, views::campgrounds::edit_form(&page, &listing))
        }
        Err(e) => fail(&req, ctx.flash, &e),
    }
}

/// `PUT /campgrounds/{id}`: multipart update, owner only.
pub async fn update(
    req: HttpRequest,
    user: CurrentUser,
    service: web::Data<ListingService>,
    path: web::Path<String>,
    payload: Multipart,
) -> HttpResponse {
    let mut ctx = RequestContext::new(user.0);

    if let Err(e) = require_authenticated(ctx.principal.as_ref()) {
        return fail(&req, ctx.flash, &e);
    }

    let id = match parse_id(&path) {
        Ok(id) => id,
        Err(e) => return fail(&req, ctx.flash, &e),
    };

    let mut submission = match read_listing_submission(payload).await {
        Ok(submission) => submission,
        Err(e) => return fail(&req, ctx.flash, &e),
    };

    let form = std::mem::take(&mut submission.form);
    let result = service
        .update(&mut ctx, id, form, submission.image.as_ref())
        .await;
    submission.discard_upload().await;

    match result {
        Ok(listing) => redirect(&listing_path(listing.id), &ctx.flash),
        Err(e) => fail(&req, ctx.flash, &e),
    }
}

/// `DELETE /campgrounds/{id}`: owner only.
pub async fn destroy(
    req: HttpRequest,
    user: CurrentUser,
    service: web::Data<ListingService>,
    path: web::Path<String>,
) -> HttpResponse {
    let mut ctx = RequestContext::new(user.0);

    let id = require_authenticated(ctx.principal.as_ref()).and_then(|_| parse_id(&path));
    let result = match id {
        Ok(id) => service.delete(&mut ctx, id).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => redirect("/campgrounds", &ctx.flash),
        Err(e) => fail(&req, ctx.flash, &e),
    }
}
