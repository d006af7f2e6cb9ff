#[macro_use]
pub mod logging;

pub mod api;
pub mod forest;
pub mod reaction;
pub mod settings;
pub mod store;

pub use api::{ApiError, ApiResult, HttpGateway, PostGateway};
pub use store::{FeedSnapshot, ModalKind, PostStore, StoreError, StoreOptions, StoreResult};
