pub mod compensation;
pub mod decoder;
pub mod handlers;
pub mod normalizer;
pub mod preview;
pub mod service;
pub mod submitter;
pub mod template;
pub mod validation;
