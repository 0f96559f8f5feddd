use maud::{Markup, html};

use super::layout::{Page, layout};

/// Landing page
pub fn landing(page: &Page<'_>) -> Markup {
    layout(
        page,
        html! {
            section class="landing" {
                h1 { "Welcome to YelpCamp!" }
                a class="btn btn-large" href="/campgrounds" { "View All Campgrounds" }
            }
        },
    )
}

/// Login form
pub fn login(page: &Page<'_>) -> Markup {
    layout(
        page,
        html! {
            section class="auth-form" {
                h1 { "Login" }
                form action="/login" method="POST" {
                    input type="text" name="username" placeholder="username" required;
                    input type="password" name="password" placeholder="password" required;
                    button class="btn btn-primary" { "Login!" }
                }
                a href="/campgrounds" { "Go Back" }
            }
        },
    )
}

/// Sign-up form
pub fn register(page: &Page<'_>) -> Markup {
    layout(
        page,
        html! {
            section class="auth-form" {
                h1 { "Sign Up" }
                form action="/register" method="POST" {
                    input type="text" name="username" placeholder="username" required;
                    input type="password" name="password" placeholder="password" minlength="6" required;
                    button class="btn btn-primary" { "Sign Up!" }
                }
                a href="/campgrounds" { "Go Back" }
            }
        },
    )
}
