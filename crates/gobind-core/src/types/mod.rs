pub mod handler;
pub mod handles;
pub mod primitive;
pub mod property_value;
pub mod type_tag;
