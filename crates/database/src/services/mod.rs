pub mod course;
pub mod enrollment;
pub mod lesson;
pub mod media;
pub mod module;
pub mod user;

/// Tri-state patch for nullable fields: distinguishes "leave untouched" from
/// "set to null" from "set to a value". `Keep` is what a request gets when it
/// omits the field entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldPatch<T> {
    #[default]
    Keep,
    Clear,
    Set(T),
}

impl<T> FieldPatch<T> {
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            FieldPatch::Keep => current,
            FieldPatch::Clear => None,
            FieldPatch::Set(value) => Some(value),
        }
    }

    pub fn is_keep(&self) -> bool {
        matches!(self, FieldPatch::Keep)
    }
}
