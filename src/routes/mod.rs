/// Route segregation by who may call them. Every module sits behind the route guard;
/// the split documents intent and keeps the handler lists readable.
pub mod admin;
pub mod authenticated;
pub mod public;
