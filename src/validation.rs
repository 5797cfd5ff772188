//! Form checks run before anything is sent to the backend.

use chrono::NaiveDate;

use crate::backend::SignUpRequest;
use crate::error::{AppError, Result};
use crate::models::{ListingDraft, ListingUpdate};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_YEAR_BUILT: i32 = 1800;

pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::validation("email", "Enter a valid email address"))
    }
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

pub fn validate_sign_up(request: &SignUpRequest) -> Result<()> {
    if request.name.trim().is_empty() {
        return Err(AppError::validation("name", "Name is required"));
    }
    validate_email(&request.email)?;
    validate_password(&request.password)
}

fn required(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(field, format!("{field} is required")));
    }
    Ok(())
}

fn check_price(price: i64) -> Result<()> {
    if price <= 0 {
        return Err(AppError::validation("price", "Price must be greater than zero"));
    }
    Ok(())
}

fn check_year(year: i32, current_year: i32) -> Result<()> {
    if year < MIN_YEAR_BUILT || year > current_year + 1 {
        return Err(AppError::validation(
            "year_built",
            format!("Year built must be between {MIN_YEAR_BUILT} and {}", current_year + 1),
        ));
    }
    Ok(())
}

pub fn validate_listing_draft(draft: &ListingDraft, current_year: i32) -> Result<()> {
    required("title", &draft.title)?;
    required("address", &draft.address)?;
    required("city", &draft.city)?;
    required("state", &draft.state)?;
    required("zip_code", &draft.zip_code)?;
    check_price(draft.price)?;
    check_year(draft.year_built, current_year)?;
    if !(0.0..=50.0).contains(&draft.bathrooms) {
        return Err(AppError::validation("bathrooms", "Bathrooms out of range"));
    }
    if !(-90.0..=90.0).contains(&draft.latitude) || !(-180.0..=180.0).contains(&draft.longitude) {
        return Err(AppError::validation("coordinates", "Location is off the map"));
    }
    Ok(())
}

pub fn validate_listing_update(update: &ListingUpdate, current_year: i32) -> Result<()> {
    if update.is_empty() {
        return Err(AppError::validation("update", "Nothing to update"));
    }
    if let Some(title) = &update.title {
        required("title", title)?;
    }
    if let Some(address) = &update.address {
        required("address", address)?;
    }
    if let Some(price) = update.price {
        check_price(price)?;
    }
    if let Some(year) = update.year_built {
        check_year(year, current_year)?;
    }
    Ok(())
}

pub fn validate_message(content: &str) -> Result<()> {
    required("content", content)
}

pub fn validate_tour_date(date: NaiveDate, today: NaiveDate) -> Result<()> {
    if date < today {
        return Err(AppError::validation("date", "Pick a date from today onwards"));
    }
    Ok(())
}
