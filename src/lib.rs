pub mod archiver;
pub mod catalog;
pub mod config;
pub mod fetch;
pub mod http;
pub mod keys;
pub mod observability;
pub mod signer;
pub mod source;
pub mod storage;
pub mod trigger;
pub mod window;
