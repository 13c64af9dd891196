use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

pub const DEFAULT_PRICE_LIMIT: u32 = 500;
pub const TITLE_MAX_CHARS: usize = 255;

// Matches the NUMERIC(10, 2) column.
const PRICE_SCALE: u32 = 2;
/// First value NUMERIC(10, 2) cannot hold; larger configured limits are capped here.
pub const MAX_PRICE_LIMIT: u32 = 100_000_000;

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: i64,
    pub title: String,
    #[schema(value_type = String, example = "19.99")]
    pub price: Decimal,
}

/// A validated title and price, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub price: Decimal,
}

/// Raw add/edit form. Both fields arrive as text so that missing and
/// unparsable values can be reported per field.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct BookForm {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
}

impl From<&Book> for BookForm {
    fn from(book: &Book) -> Self {
        Self {
            title: Some(book.title.clone()),
            price: Some(book.price.to_string()),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl BookForm {
    /// Check every field and collect all violations.
    ///
    /// The price is rounded half away from zero to two decimals before the
    /// range checks, so the checks see the value that will be stored.
    ///
    /// # Errors
    /// Returns one [`FieldError`] per violated constraint.
    pub fn validate(&self, price_limit: u32) -> Result<NewBook, Vec<FieldError>> {
        let price_limit = price_limit.min(MAX_PRICE_LIMIT);
        let mut errors = Vec::new();

        let title = match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => {
                if title.chars().count() > TITLE_MAX_CHARS {
                    errors.push(FieldError::new(
                        "title",
                        format!("Title must be at most {TITLE_MAX_CHARS} characters"),
                    ));
                }
                Some(title.to_string())
            }
            _ => {
                errors.push(FieldError::new("title", "Title is required"));
                None
            }
        };

        let price = match self.price.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => match Decimal::from_str(raw) {
                Ok(value) => {
                    let mut value = value
                        .round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero);
                    // Same scale as NUMERIC(10, 2) so "45" and "45.00" render alike.
                    value.rescale(PRICE_SCALE);
                    if value <= Decimal::ZERO {
                        errors.push(FieldError::new("price", "Price must be greater than zero"));
                    } else if value >= Decimal::from(price_limit) {
                        errors.push(FieldError::new(
                            "price",
                            format!("Price must be a value lower than {price_limit}"),
                        ));
                    }
                    Some(value)
                }
                Err(_) => {
                    errors.push(FieldError::new("price", "Price must be a number"));
                    None
                }
            },
            _ => {
                errors.push(FieldError::new("price", "Price is required"));
                None
            }
        };

        match (title, price) {
            (Some(title), Some(price)) if errors.is_empty() => Ok(NewBook { title, price }),
            _ => Err(errors),
        }
    }
}
