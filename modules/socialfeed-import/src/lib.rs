pub mod assets;
pub mod error;
pub mod import;
pub mod scheduler;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use assets::AssetRegistrar;
pub use error::{ImportError, Result, StoreError};
pub use import::{ImportReport, ImportService, ImportSettings, ProviderOutcome, SOCIAL_MEDIA_TAG};
pub use scheduler::ImportScheduler;
pub use store::{
    Asset, AssetStore, ElementType, InMemoryStore, PgStore, PostStore, Tag, TagService,
};
