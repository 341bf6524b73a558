pub mod acl;
pub mod context;
pub mod error;
pub mod events;
pub mod fanout;
pub mod headers;
pub mod policy;
pub mod reconciler;
pub mod schema;
pub mod storage;
