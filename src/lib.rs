//! Graph API media publishing with a persisted long-lived token.
//!
//! ```no_run
//! use graph_poster::{
//!     Config, ContainerParams, GraphApi, MediaPublisher, SqliteTokenStore, TokenCache,
//!     UploadOptions,
//! };
//!
//! # async fn example() -> graph_poster::Result<()> {
//! let config = Config::from_env()?;
//! let cache = TokenCache::new(SqliteTokenStore::from_config("credentials.db", &config)?);
//! let api = GraphApi::new(config);
//!
//! let token = api.long_lived_token(&cache).await?;
//! let publisher = MediaPublisher::new(api)?;
//! let result = publisher
//!     .upload_reel(
//!         &ContainerParams::reel("https://cdn.example.com/reel.mp4", "#happy #funny #smile"),
//!         token.as_str(),
//!         &UploadOptions::default(),
//!     )
//!     .await?;
//! println!("published {:?}", result.media_id());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod graph_api;
pub mod logging;
pub mod notify;
pub mod store;
pub mod token_cache;
mod util;

pub use config::Config;
pub use error::{Error, GraphError, Result};
pub use graph_api::ig::{MediaPublisher, PollOptions, PublishOptions, PublishResult, UploadOptions};
pub use graph_api::media::{ContainerParams, MediaSource, MediaType, UserTag};
pub use graph_api::transport::{GraphRequest, GraphResponse, ReqwestTransport, Transport};
pub use graph_api::{ContainerStatus, GraphApi, UploadStatus};
pub use notify::{LogNotifier, Notifier};
pub use store::{MemoryTokenStore, SqliteTokenStore, StoredToken, TokenStore};
pub use token_cache::{AccessToken, Clock, SystemClock, TokenCache};
pub use tokio_util::sync::CancellationToken;
