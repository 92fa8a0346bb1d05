/// Submitted forms for posts and comments
use crate::db::Store;
use crate::error::{AppError, FieldErrors, Result};
use crate::models::{normalize_image_ref, IMAGE_MAX_LENGTH};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const INVALID_CHOICE_MESSAGE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

fn image_too_long_message(length: usize) -> String {
    format!(
        "Ensure this filename has at most {} characters (it has {}).",
        IMAGE_MAX_LENGTH, length
    )
}

fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some(Cow::Borrowed(REQUIRED_MESSAGE));
        return Err(err);
    }
    Ok(())
}

/// Post create/edit form; `group` is the raw select value (empty means none)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct PostForm {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub text: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Validated post fields ready for the store
#[derive(Debug, Clone, PartialEq)]
pub struct CleanPost {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

impl PostForm {
    /// Validate every field, collecting all errors before failing.
    pub async fn clean(&self, store: &dyn Store) -> Result<CleanPost> {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(errs) => match AppError::from(errs) {
                AppError::Validation(fields) => fields,
                other => return Err(other),
            },
        };

        let group_id = match self.group.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) if store.get_group(id).await?.is_some() => Some(id),
                _ => {
                    errors
                        .entry("group".to_string())
                        .or_default()
                        .push(INVALID_CHOICE_MESSAGE.to_string());
                    None
                }
            },
        };

        let image = normalize_image_ref(self.image.as_deref());
        if let Some(length) = image.as_deref().map(|name| name.chars().count()) {
            if length > IMAGE_MAX_LENGTH {
                errors
                    .entry("image".to_string())
                    .or_default()
                    .push(image_too_long_message(length));
            }
        }

        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        Ok(CleanPost {
            text: self.text.trim().to_string(),
            group_id,
            image,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct CommentForm {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub text: String,
}

impl CommentForm {
    pub fn clean(&self) -> Result<String> {
        self.validate()?;
        Ok(self.text.trim().to_string())
    }
}
