pub mod config;
pub mod text_extract;
pub mod types;

pub use config::{
    Config, FacebookCredentials, InstagramCredentials, LinkedinCredentials, TwitterCredentials,
};
pub use text_extract::{extract_bracket_mentions, extract_hashtags, extract_mentions};
pub use types::*;
