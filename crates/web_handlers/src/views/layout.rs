use auth_services::types::Principal;
use campgrounds::Flash;
use maud::{DOCTYPE, Markup, html};

/// What every page needs besides its own content.
pub struct Page<'a> {
    /// Title shown in the browser tab
    pub title: &'a str,
    /// The signed-in user, if any
    pub user: Option<&'a Principal>,
    /// Messages to show once
    pub flash: &'a Flash,
}

/// Wraps page content in the site chrome: navigation and flash banners.
pub fn layout(page: &Page<'_>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "YelpCamp | " (page.title) }
                link rel="stylesheet" href="/public/stylesheets/main.css";
            }
            body {
                nav class="navbar" {
                    a class="brand" href="/" { "YelpCamp" }
                    ul class="nav-left" {
                        li { a href="/campgrounds" { "Home" } }
                    }
                    ul class="nav-right" {
                        @match page.user {
                            Some(user) => {
                                li { "Signed In As " (user.username) }
                                li { a href="/logout" { "Logout" } }
                            }
                            None => {
                                li { a href="/login" { "Login" } }
                                li { a href="/register" { "Sign Up" } }
                            }
                        }
                    }
                }
                main class="container" {
                    @for message in &page.flash.error {
                        div class="alert alert-danger" role="alert" { (message) }
                    }
                    @for message in &page.flash.success {
                        div class="alert alert-success" role="alert" { (message) }
                    }
                    (content)
                }
            }
        }
    }
}
