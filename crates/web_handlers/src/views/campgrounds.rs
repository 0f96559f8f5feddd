use campgrounds::{Listing, ListingIndex};
use chrono::{DateTime, Utc};
use maud::{Markup, html};

use super::layout::{Page, layout};

fn display_date(at: &DateTime<Utc>) -> String {
    at.format("%B %-d, %Y").to_string()
}

fn page_href(number: u32, search: Option<&str>) -> String {
    match search {
        Some(text) => format!(
            "/campgrounds?page={}&search={}",
            number,
            urlencoding::encode(text)
        ),
        None => format!("/campgrounds?page={}", number),
    }
}

fn pagination(index: &ListingIndex) -> Markup {
    let current = index.current_page;
    let last = index.total_pages;
    let search = index.search.as_deref();

    html! {
        @if last > 0 {
            nav class="pagination" {
                ul {
                    @if current > 1 {
                        li { a href=(page_href(1, search)) { "First" } }
                        li { a href=(page_href(current - 1, search)) { "«" } }
                    }
                    @for number in 1..=last {
                        li class=[(number == current).then_some("active")] {
                            a href=(page_href(number, search)) { (number) }
                        }
                    }
                    @if current < last {
                        li { a href=(page_href(current + 1, search)) { "»" } }
                        li { a href=(page_href(last, search)) { "Last" } }
                    }
                }
            }
        }
    }
}

/// Campground index with search and pagination
pub fn index(page: &Page<'_>, index: &ListingIndex) -> Markup {
    layout(
        page,
        html! {
            header class="jumbotron" {
                h1 { "Welcome To YelpCamp!" }
                p { "View our hand-picked campgrounds from all over the world" }
                p { a class="btn btn-primary" href="/campgrounds/new" { "Add New Campground" } }
                form class="search" action="/campgrounds" method="GET" {
                    input type="text" name="search" placeholder="Campground search..."
                        value=[index.search.as_deref()];
                    input class="btn" type="submit" value="Search";
                }
            }
            @if let Some(message) = &index.no_match {
                h3 class="no-match" { (message) }
            }
            div class="grid" {
                @for listing in &index.listings {
                    div class="card" {
                        @if let Some(image) = &listing.image {
                            img src=(image.url) alt=(listing.name);
                        }
                        div class="caption" {
                            h4 { (listing.name) }
                        }
                        p {
                            a class="btn btn-primary" href=(format!("/campgrounds/{}", listing.id)) {
                                "More Info"
                            }
                        }
                    }
                }
            }
            (pagination(index))
        },
    )
}

/// Campground detail with owner controls and comments
pub fn show(page: &Page<'_>, listing: &Listing) -> Markup {
    let is_owner = page
        .user
        .is_some_and(|user| user.id == listing.author.principal_id);
    let map_href = format!(
        "https://www.google.com/maps/search/?api=1&query={},{}",
        listing.location.latitude, listing.location.longitude
    );

    layout(
        page,
        html! {
            div class="show" {
                aside class="location" {
                    h5 { "Location" }
                    p { (listing.location.formatted_address) }
                    p class="coords" {
                        (format!("{:.4}, {:.4}", listing.location.latitude, listing.location.longitude))
                    }
                    a href=(map_href) target="_blank" rel="noopener" { "View on map" }
                }
                article class="thumbnail" {
                    @if let Some(image) = &listing.image {
                        img src=(image.url) alt=(listing.name);
                    }
                    div class="caption" {
                        h4 class="name" { (listing.name) }
                        p { (listing.description) }
                        p {
                            em {
                                "Submitted by " (listing.author.display_name) ", "
                                (display_date(&listing.created_at))
                            }
                        }
                        @if is_owner {
                            a class="btn btn-warning" href=(format!("/campgrounds/{}/edit", listing.id)) {
                                "Edit"
                            }
                            form class="delete-form"
                                action=(format!("/campgrounds/{}?_method=DELETE", listing.id))
                                method="POST" {
                                button class="btn btn-danger" { "Delete" }
                            }
                        }
                    }
                    section class="comments" {
                        h5 { "Comments" }
                        @if listing.comments.is_empty() {
                            p class="empty" { "No comments yet." }
                        }
                        @for comment in &listing.comments {
                            div class="comment" {
                                strong { (comment.author.display_name) }
                                span class="date" { (display_date(&comment.created_at)) }
                                p { (comment.text) }
                            }
                        }
                    }
                }
            }
        },
    )
}

fn listing_form(action: &str, listing: Option<&Listing>, submit: &str) -> Markup {
    html! {
        form class="listing-form" action=(action) method="POST" enctype="multipart/form-data" {
            label for="name" { "Name" }
            input id="name" type="text" name="campground[name]" placeholder="name" required
                value=[listing.map(|l| l.name.as_str())];
            label for="image" { "Image" }
            @if listing.is_some() {
                input id="image" type="file" name="image" accept="image/*";
            } @else {
                input id="image" type="file" name="image" accept="image/*" required;
            }
            label for="description" { "Description" }
            textarea id="description" name="campground[description]" placeholder="description" {
                @if let Some(listing) = listing { (listing.description) }
            }
            label for="location" { "Location" }
            input id="location" type="text" name="campground[location]"
                placeholder="Yosemite National Park, CA" required
                value=[listing.map(|l| l.location.raw_address.as_str())];
            button class="btn btn-primary" { (submit) }
        }
        a href="/campgrounds" { "Go Back" }
    }
}

/// Form for a new campground
pub fn new_form(page: &Page<'_>) -> Markup {
    layout(
        page,
        html! {
            h1 { "Create a New Campground" }
            (listing_form("/campgrounds", None, "Submit!"))
        },
    )
}

/// Form editing an existing campground
pub fn edit_form(page: &Page<'_>, listing: &Listing) -> Markup {
    layout(
        page,
        html! {
            h1 { "Edit " (listing.name) }
            (listing_form(
                &format!("/campgrounds/{}?_method=PUT", listing.id),
                Some(listing),
                "Submit!",
            ))
        },
    )
}
