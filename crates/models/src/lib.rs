pub mod media;
pub mod publish;
pub mod roles;
pub mod status;
