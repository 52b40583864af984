pub mod conversion;
pub mod drive;
pub mod guard;
pub mod handlers;
pub mod pipeline;
