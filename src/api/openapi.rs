use super::handlers::{auth, budgets, health, reminders, transactions};
use utoipa::openapi::{
    security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    ComponentsBuilder, Contact, InfoBuilder, License, OpenApiBuilder, Tag,
};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI spec.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and documented. Handlers sharing a path go in the same `routes!` call.
pub(crate) fn api_router() -> OpenApiRouter {
    OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(auth::account::register))
        .routes(routes!(auth::session::login))
        .routes(routes!(auth::session::logout))
        .routes(routes!(auth::account::get_me, auth::account::delete_me))
        .routes(routes!(auth::account::change_password))
        .routes(routes!(auth::session::list_sessions))
        .routes(routes!(
            transactions::list_transactions,
            transactions::create_transaction
        ))
        .routes(routes!(
            transactions::update_transaction,
            transactions::delete_transaction
        ))
        .routes(routes!(budgets::list_budgets, budgets::create_budget))
        .routes(routes!(
            reminders::list_reminders,
            reminders::create_reminder
        ))
        .routes(routes!(reminders::delete_reminder))
}

fn tag(name: &str, description: &str) -> Tag {
    let mut tag = Tag::new(name);
    tag.description = Some(description.to_string());
    tag
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    // Tags and security schemes must be in place before routes are added;
    // the router only merges paths and schemas into this document.
    OpenApiBuilder::new()
        .info(info)
        .tags(Some(vec![
            tag("auth", "Registration, login and session management"),
            tag("transactions", "Income and expense records"),
            tag("budgets", "Spending limits"),
            tag("reminders", "Dated reminders"),
            tag("health", "Service health"),
        ]))
        .components(Some(
            ComponentsBuilder::new()
                .security_scheme(
                    "bearer",
                    SecurityScheme::Http(
                        HttpBuilder::new()
                            .scheme(HttpAuthScheme::Bearer)
                            .bearer_format("JWT")
                            .build(),
                    ),
                )
                .build(),
        ))
        .build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let primary = env!("CARGO_PKG_AUTHORS").split(';').next().map(str::trim)?;
    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.split_once('<') {
        Some((name, email)) => (
            optional_str(name),
            optional_str(email.trim_end_matches('>')),
        ),
        None => (optional_str(author), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));

        let contact = spec.info.contact.unwrap_or_default();
        assert_eq!(contact.name.as_deref(), Some("Team Fintrack"));
        assert_eq!(contact.email.as_deref(), Some("team@fintrack.dev"));

        let license = spec.info.license;
        assert_eq!(
            license.and_then(|license| license.identifier).as_deref(),
            Some("BSD-3-Clause")
        );
    }

    #[test]
    fn every_route_is_documented() {
        let spec = openapi();
        for path in [
            "/health",
            "/auth/register",
            "/auth/login",
            "/auth/logout",
            "/auth/me",
            "/auth/change-password",
            "/auth/sessions",
            "/transactions",
            "/transactions/{id}",
            "/budgets",
            "/reminders",
            "/reminders/{id}",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
        let tags = spec.tags.unwrap_or_default();
        for name in ["auth", "transactions", "budgets", "reminders", "health"] {
            assert!(tags.iter().any(|tag| tag.name == name), "missing tag {name}");
        }
    }

    #[test]
    fn bearer_scheme_survives_route_registration() {
        let spec = openapi();
        let components = spec.components.unwrap_or_default();
        assert!(components.security_schemes.contains_key("bearer"));
        // Handler schemas are merged next to the scheme, not in place of it.
        assert!(components.schemas.contains_key("ErrorBody"));
        assert!(components.schemas.contains_key("Transaction"));
    }

    #[test]
    fn parse_author_variants() {
        assert_eq!(
            parse_author("Jane Doe <jane@example.com>"),
            (Some("Jane Doe"), Some("jane@example.com"))
        );
        assert_eq!(parse_author("Jane Doe"), (Some("Jane Doe"), None));
        assert_eq!(parse_author("<jane@example.com>"), (None, Some("jane@example.com")));
        assert_eq!(parse_author(""), (None, None));
    }
}
