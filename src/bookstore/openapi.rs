use utoipa::{
    OpenApi,
    openapi::{Contact, License},
};

use super::handlers::{books, health, login, root};
use crate::{
    auth::{Permission, Role},
    catalog::{Book, BookForm, FieldError},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        root::root,
        health::health,
        login::login_page,
        login::login,
        login::logout,
        login::me,
        books::list_books,
        books::add_form,
        books::add_book,
        books::edit_form,
        books::update_book,
        books::delete_book,
    ),
    components(schemas(
        Book,
        BookForm,
        FieldError,
        books::BookFormView,
        health::Health,
        login::LoginPage,
        login::LoginForm,
        login::MeResponse,
        Role,
        Permission,
    )),
    tags(
        (name = "bookstore", description = "Bookstore"),
        (name = "books", description = "Books catalogue"),
        (name = "auth", description = "Form login and sessions"),
        (name = "health", description = "Service health"),
    )
)]
struct ApiDoc;

/// The `OpenAPI` document, with info taken from Cargo metadata.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = env!("CARGO_PKG_NAME").to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc.info.description = optional_str(env!("CARGO_PKG_DESCRIPTION")).map(str::to_string);
    doc.info.contact = cargo_contact();
    doc.info.license = optional_str(env!("CARGO_PKG_LICENSE")).map(|identifier| {
        let mut license = License::new(identifier);
        license.identifier = Some(identifier.to_string());
        license
    });
    doc
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `:` separated and may include "Name <email>".
    let primary = env!("CARGO_PKG_AUTHORS").split(':').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = match primary.find('<') {
        Some(start) => (
            primary[..start].trim(),
            primary[start + 1..].trim_end_matches('>').trim(),
        ),
        None => (primary, ""),
    };

    let mut contact = Contact::new();
    contact.name = optional_str(name).map(str::to_string);
    contact.email = optional_str(email).map(str::to_string);
    Some(contact)
}

fn optional_str(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
