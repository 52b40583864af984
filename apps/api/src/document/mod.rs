pub mod builder;
pub mod docx;
pub mod inline;
pub mod model;
pub mod naming;
pub mod profile;
pub mod segmenter;
