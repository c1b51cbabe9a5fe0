pub mod schema;
pub mod secrets;

pub use schema::{ActionKind, AnswerSpec, FormSpec, LoginStep, OneOrMany, PageSpec, Payload, Strategy};
pub use secrets::Secrets;
