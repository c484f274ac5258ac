pub mod callback_context;
pub mod object;
pub mod registry;
pub mod value;
