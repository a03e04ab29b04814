pub mod api;
pub mod config;
pub mod console;
pub mod extractor;
pub mod humanize;
pub mod info;
pub mod jobs;
pub mod observability;
pub mod policy;
pub mod worker;
