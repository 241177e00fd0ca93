/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust response wrappers with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use serde::{Deserialize, Serialize};

/// `{ "count": n, "data": [...] }` envelope used by list endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    #[serde(default)]
    pub count: u64,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
