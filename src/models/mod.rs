pub mod url;

pub use url::{
    CreateUrlRequest, CreatedLink, LinkMetadata, LinkStats, LinkSummary, ListUrlsResponse,
    ShortenResponse, UrlStatsResponse,
};
