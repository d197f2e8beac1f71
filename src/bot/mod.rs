/// Command, message and callback handlers
pub mod handlers;
/// Texts and keyboards
pub mod views;
