//! Profile command handlers.

mod register_profile;
mod update_display_fields;

pub use register_profile::{RegisterProfileCommand, RegisterProfileHandler, RegisterProfileResult};
pub use update_display_fields::{
    UpdateDisplayFieldsCommand, UpdateDisplayFieldsHandler, UpdateDisplayFieldsResult,
};
