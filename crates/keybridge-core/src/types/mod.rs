/*
[INPUT]:  Domain records and boundary payload definitions
[OUTPUT]: Typed Rust structs/enums with serialization support
[POS]:    Data layer - shared types for every component
[UPDATE]: When records or payloads change or new types added
*/

pub mod models;
pub mod requests;
pub mod responses;

pub use models::*;
pub use requests::*;
pub use responses::*;
