//! Authorization policies: pure `(actor, subject) -> bool` decisions with no
//! side effects. Callers fetch whatever context a rule needs (e.g. the actor's
//! pivot row for a course) and pass it in, so the functions stay testable
//! without a database.

pub mod course;
pub mod user;
